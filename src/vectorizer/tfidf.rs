use num::{Float, FromPrimitive};

use crate::error::{PipelineError, Result};

pub trait WeightEngine<N>
where
    N: Float,
{
    /// Weight of a term in one document.
    /// # Arguments
    /// * `term_frequency` - occurrences of the term in the document
    /// * `document_frequency` - documents of the corpus containing the term
    /// * `num_docs` - documents in the corpus
    fn weight(term_frequency: u64, document_frequency: u64, num_docs: u64) -> Result<N>;
}

/// Default weighting engine
///
/// `weight = term_frequency * ln(num_docs / document_frequency)`
///
/// The term frequency is the raw count, not divided by the document length.
/// Stored weights depend on this exact formula, so it is kept as is.
/// A zero document frequency means the vocabulary and the corpus counters
/// disagree and is reported as a data-integrity error.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultWeightEngine;

impl<N> WeightEngine<N> for DefaultWeightEngine
where
    N: Float + FromPrimitive,
{
    #[inline]
    fn weight(term_frequency: u64, document_frequency: u64, num_docs: u64) -> Result<N> {
        if document_frequency == 0 {
            return Err(PipelineError::DataIntegrity(
                "term with zero document frequency".into(),
            ));
        }
        let idf = (num_docs as f64 / document_frequency as f64).ln();
        let w = term_frequency as f64 * idf;
        N::from_f64(w).ok_or_else(|| {
            PipelineError::DataIntegrity(format!("weight {w} not representable"))
        })
    }
}
