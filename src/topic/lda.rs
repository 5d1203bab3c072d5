//! Default fitting backend: latent Dirichlet allocation fitted by collapsed
//! Gibbs sampling.
//!
//! In multicore mode every sweep splits the documents into `workers` shards
//! that are sampled in parallel against a snapshot of the topic-term counts
//! (approximate distributed LDA). The global counts are rebuilt from the
//! topic assignments after each sweep.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::config::{InferenceConfig, TrainingConfig};
use crate::error::{PipelineError, Result};
use crate::topic::serde::LdaData;
use crate::topic::{FittedModel, TopicBackend};
use crate::vectorizer::BowCorpus;

/// Fitting settings come with each `fit` call; the backend only carries
/// what the fitted model needs at inference time.
#[derive(Debug, Clone, Default)]
pub struct LdaBackend {
    inference: InferenceConfig,
}

impl LdaBackend {
    pub fn new(inference: InferenceConfig) -> Self {
        Self { inference }
    }
}

/// Sampler state of one document.
struct DocState {
    words: Vec<u32>,
    topics: Vec<usize>,
    /// tokens of this document per topic
    topic_counts: Vec<u32>,
}

/// Topic-term counts, `term_counts[k * vocabulary_size + w]`.
#[derive(Clone)]
struct Counts {
    term_counts: Vec<u32>,
    topic_totals: Vec<u32>,
}

impl Counts {
    fn from_docs(docs: &[DocState], num_topics: usize, vocabulary_size: usize) -> Self {
        let mut counts = Counts {
            term_counts: vec![0; num_topics * vocabulary_size],
            topic_totals: vec![0; num_topics],
        };
        for doc in docs {
            for (&w, &k) in doc.words.iter().zip(&doc.topics) {
                counts.term_counts[k * vocabulary_size + w as usize] += 1;
                counts.topic_totals[k] += 1;
            }
        }
        counts
    }
}

struct Sampler<'a> {
    alpha: &'a [f64],
    eta: f64,
    vocabulary_size: usize,
}

impl Sampler<'_> {
    /// One Gibbs pass over the tokens of `doc`.
    fn sweep(&self, doc: &mut DocState, counts: &mut Counts, probs: &mut [f64], rng: &mut StdRng) {
        let v = self.vocabulary_size;
        let v_eta = v as f64 * self.eta;
        for i in 0..doc.words.len() {
            let w = doc.words[i] as usize;
            let old = doc.topics[i];
            doc.topic_counts[old] -= 1;
            counts.term_counts[old * v + w] -= 1;
            counts.topic_totals[old] -= 1;

            let mut total = 0.0;
            for (k, p) in probs.iter_mut().enumerate() {
                *p = (doc.topic_counts[k] as f64 + self.alpha[k])
                    * (counts.term_counts[k * v + w] as f64 + self.eta)
                    / (counts.topic_totals[k] as f64 + v_eta);
                total += *p;
            }
            let new = draw(probs, total, rng);

            doc.topics[i] = new;
            doc.topic_counts[new] += 1;
            counts.term_counts[new * v + w] += 1;
            counts.topic_totals[new] += 1;
        }
    }
}

#[inline]
fn draw(probs: &[f64], total: f64, rng: &mut StdRng) -> usize {
    let u = rng.gen::<f64>() * total;
    let mut acc = 0.0;
    for (k, &p) in probs.iter().enumerate() {
        acc += p;
        if u < acc {
            return k;
        }
    }
    probs.len() - 1
}

impl TopicBackend for LdaBackend {
    type Model = LdaModel;

    fn fit(&self, corpus: &BowCorpus, vocabulary_size: usize, training: &TrainingConfig) -> Result<LdaModel> {
        let num_topics = training.num_topics;
        if num_topics == 0 {
            return Err(PipelineError::Fit("number of topics must be at least 1".into()));
        }
        if vocabulary_size == 0 {
            return Err(PipelineError::Fit("cannot fit over an empty vocabulary".into()));
        }
        if corpus.num_tokens() == 0 {
            return Err(PipelineError::Fit("cannot fit an empty corpus".into()));
        }

        let mut rng = StdRng::seed_from_u64(training.seed);
        let mut docs = Vec::with_capacity(corpus.len());
        for bow in corpus.bows() {
            let mut words = Vec::new();
            for &(idx, count) in bow {
                if idx as usize >= vocabulary_size {
                    return Err(PipelineError::Fit(format!(
                        "term index {idx} outside a vocabulary of {vocabulary_size}"
                    )));
                }
                words.extend(std::iter::repeat(idx).take(count as usize));
            }
            let topics: Vec<usize> = words.iter().map(|_| rng.gen_range(0..num_topics)).collect();
            let mut topic_counts = vec![0u32; num_topics];
            for &k in &topics {
                topic_counts[k] += 1;
            }
            docs.push(DocState {
                words,
                topics,
                topic_counts,
            });
        }

        let alpha = vec![1.0 / num_topics as f64; num_topics];
        let eta = 1.0 / num_topics as f64;
        let sampler = Sampler {
            alpha: &alpha,
            eta,
            vocabulary_size,
        };
        let mut counts = Counts::from_docs(&docs, num_topics, vocabulary_size);

        info!(
            "Fitting {} topics over {} documents, {} terms, {} sweeps",
            num_topics,
            docs.len(),
            vocabulary_size,
            training.iterations
        );

        if training.multicore && training.workers > 1 {
            let workers = training.workers;
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(workers)
                .build()
                .map_err(|e| PipelineError::Fit(format!("cannot start {workers} workers: {e}")))?;
            let shard_len = docs.len().div_ceil(workers).max(1);
            let seed = training.seed;

            for sweep in 0..training.iterations {
                let snapshot = &counts;
                pool.install(|| {
                    docs.par_chunks_mut(shard_len)
                        .enumerate()
                        .for_each(|(shard, shard_docs)| {
                            let mut local = snapshot.clone();
                            let mut probs = vec![0.0; num_topics];
                            let mut rng = StdRng::seed_from_u64(
                                seed ^ ((sweep as u64) << 32) ^ (shard as u64 + 1),
                            );
                            for doc in shard_docs.iter_mut() {
                                sampler.sweep(doc, &mut local, &mut probs, &mut rng);
                            }
                        });
                });
                counts = Counts::from_docs(&docs, num_topics, vocabulary_size);
                debug!("sweep {} done", sweep + 1);
            }
        } else {
            let mut probs = vec![0.0; num_topics];
            for sweep in 0..training.iterations {
                for doc in docs.iter_mut() {
                    sampler.sweep(doc, &mut counts, &mut probs, &mut rng);
                }
                debug!("sweep {} done", sweep + 1);
            }
        }

        let v_eta = vocabulary_size as f64 * eta;
        let topic_word = (0..num_topics)
            .map(|k| {
                let total = counts.topic_totals[k] as f64 + v_eta;
                counts.term_counts[k * vocabulary_size..(k + 1) * vocabulary_size]
                    .iter()
                    .map(|&c| (c as f64 + eta) / total)
                    .collect()
            })
            .collect();

        Ok(LdaModel {
            num_topics,
            vocabulary_size,
            alpha,
            eta,
            topic_word,
            minimum_probability: self.inference.minimum_probability,
            inference_iterations: self.inference.iterations,
        })
    }
}

/// Fitted LDA parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct LdaModel {
    pub(crate) num_topics: usize,
    pub(crate) vocabulary_size: usize,
    pub(crate) alpha: Vec<f64>,
    pub(crate) eta: f64,
    pub(crate) topic_word: Vec<Vec<f64>>,
    pub(crate) minimum_probability: f64,
    pub(crate) inference_iterations: usize,
}

impl LdaModel {
    /// Unpruned topic mixture of a document, estimated by fixed-point
    /// iteration with the topic-term distributions held fixed.
    /// Terms outside the vocabulary are ignored.
    pub fn fold_in(&self, bow: &[(u32, u32)]) -> Vec<f64> {
        let k_num = self.num_topics;
        let mut theta = vec![1.0 / k_num as f64; k_num];
        let terms: Vec<(usize, f64)> = bow
            .iter()
            .filter(|&&(idx, _)| (idx as usize) < self.vocabulary_size)
            .map(|&(idx, c)| (idx as usize, c as f64))
            .collect();
        if terms.is_empty() {
            let sum: f64 = self.alpha.iter().sum();
            return self.alpha.iter().map(|a| a / sum).collect();
        }

        let mut next = vec![0.0; k_num];
        for _ in 0..self.inference_iterations.max(1) {
            next.copy_from_slice(&self.alpha);
            for &(w, c) in &terms {
                let norm: f64 = (0..k_num).map(|k| theta[k] * self.topic_word[k][w]).sum();
                for k in 0..k_num {
                    next[k] += c * theta[k] * self.topic_word[k][w] / norm;
                }
            }
            let sum: f64 = next.iter().sum();
            for (t, n) in theta.iter_mut().zip(&next) {
                *t = n / sum;
            }
        }
        theta
    }
}

impl FittedModel for LdaModel {
    fn num_topics(&self) -> usize {
        self.num_topics
    }

    fn vocabulary_size(&self) -> usize {
        self.vocabulary_size
    }

    fn alpha(&self) -> &[f64] {
        &self.alpha
    }

    fn topic_terms(&self, topic: usize) -> Option<&[f64]> {
        self.topic_word.get(topic).map(Vec::as_slice)
    }

    fn infer(&self, bow: &[(u32, u32)]) -> Vec<(usize, f64)> {
        self.fold_in(bow)
            .into_iter()
            .enumerate()
            .filter(|&(_, p)| p >= self.minimum_probability)
            .collect()
    }

    fn log_perplexity(&self, corpus: &BowCorpus) -> Result<f64> {
        let num_tokens = corpus.num_tokens();
        if num_tokens == 0 {
            return Err(PipelineError::DataIntegrity("cannot score an empty corpus".into()));
        }
        let bows: Vec<&[(u32, u32)]> = corpus.bows().collect();
        let log_likelihood: f64 = bows
            .par_iter()
            .map(|bow| {
                let theta = self.fold_in(bow);
                bow.iter()
                    .filter(|&&(idx, _)| (idx as usize) < self.vocabulary_size)
                    .map(|&(idx, c)| {
                        let p: f64 = theta
                            .iter()
                            .zip(&self.topic_word)
                            .map(|(t, row)| t * row[idx as usize])
                            .sum();
                        c as f64 * p.ln()
                    })
                    .sum::<f64>()
            })
            .sum();
        Ok(log_likelihood / num_tokens as f64)
    }

    /// Written to a temporary file next to `path`, then renamed over it.
    fn save(&self, path: &Path) -> Result<()> {
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let mut tmp = NamedTempFile::new_in(dir)?;
        serde_cbor::to_writer(&mut tmp, self)?;
        tmp.persist(path).map_err(|e| PipelineError::Io(e.error))?;
        Ok(())
    }

    fn load(path: &Path) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        let data: LdaData = serde_cbor::from_reader(reader)?;
        data.into_model()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Two groups of documents over disjoint halves of a six term vocabulary.
    fn two_group_corpus() -> BowCorpus {
        (0..20u64)
            .map(|d| {
                let base = if d < 10 { 0 } else { 3 };
                let bow = vec![(base, 7), (base + 1, 7), (base + 2, 6)];
                (d + 1, bow)
            })
            .collect()
    }

    fn training(multicore: bool, num_topics: usize) -> TrainingConfig {
        TrainingConfig {
            num_topics,
            multicore,
            workers: 2,
            iterations: 100,
            ..Default::default()
        }
    }

    fn assert_well_formed(model: &LdaModel, topics: usize, terms: usize) {
        assert_eq!(model.num_topics(), topics);
        assert_eq!(model.vocabulary_size(), terms);
        assert_eq!(model.alpha().len(), topics);
        assert!(model.alpha().iter().all(|&a| a >= 0.0));
        for k in 0..topics {
            let row = model.topic_terms(k).unwrap();
            assert_eq!(row.len(), terms);
            assert!((row.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        }
        assert!(model.topic_terms(topics).is_none());
    }

    #[test]
    fn fit_produces_normalized_topics() {
        let model = LdaBackend::default().fit(&two_group_corpus(), 6, &training(false, 2)).unwrap();
        assert_well_formed(&model, 2, 6);

        let model = LdaBackend::default().fit(&two_group_corpus(), 8, &training(false, 5)).unwrap();
        assert_well_formed(&model, 5, 8);
    }

    #[test]
    fn disjoint_groups_get_separate_topics() {
        let corpus = two_group_corpus();
        let model = LdaBackend::default().fit(&corpus, 6, &training(false, 2)).unwrap();
        for k in 0..2 {
            let top: Vec<u32> = model.show_topic(k, 3).into_iter().map(|(i, _)| i).collect();
            assert!(top.iter().all(|&i| i < 3) || top.iter().all(|&i| i >= 3), "{top:?}");
        }
        let dominant = |bow: &[(u32, u32)]| {
            model
                .fold_in(bow)
                .into_iter()
                .enumerate()
                .max_by(|a, b| a.1.total_cmp(&b.1))
                .map(|(k, _)| k)
                .unwrap()
        };
        assert_ne!(dominant(&[(0, 3), (1, 2)]), dominant(&[(4, 3), (5, 2)]));
    }

    #[test]
    fn multicore_fit_is_well_formed_and_reproducible() {
        let corpus = two_group_corpus();
        let a = LdaBackend::default().fit(&corpus, 6, &training(true, 2)).unwrap();
        let b = LdaBackend::default().fit(&corpus, 6, &training(true, 2)).unwrap();
        assert_well_formed(&a, 2, 6);
        assert_eq!(a, b);
    }

    #[test]
    fn single_thread_fit_is_reproducible() {
        let corpus = two_group_corpus();
        let a = LdaBackend::default().fit(&corpus, 6, &training(false, 3)).unwrap();
        let b = LdaBackend::default().fit(&corpus, 6, &training(false, 3)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn degenerate_inputs_fail_to_fit() {
        let corpus = two_group_corpus();
        let fit = |corpus: &BowCorpus, terms: usize, topics: usize| {
            LdaBackend::default().fit(corpus, terms, &training(false, topics))
        };
        assert!(matches!(fit(&corpus, 6, 0), Err(PipelineError::Fit(_))));
        assert!(matches!(fit(&corpus, 0, 2), Err(PipelineError::Fit(_))));
        assert!(matches!(fit(&corpus, 4, 2), Err(PipelineError::Fit(_))));

        let empty: BowCorpus = vec![(1, Vec::new()), (2, Vec::new())].into_iter().collect();
        assert!(matches!(fit(&empty, 6, 2), Err(PipelineError::Fit(_))));
        assert!(matches!(fit(&BowCorpus::new(), 6, 2), Err(PipelineError::Fit(_))));
    }

    #[test]
    fn mixtures_are_pruned_and_bounded() {
        let model = LdaBackend::default().fit(&two_group_corpus(), 6, &training(false, 4)).unwrap();
        for bow in [vec![(0, 2), (4, 1)], vec![(2, 5)], vec![], vec![(99, 1)]] {
            let mixture = model.infer(&bow);
            let sum: f64 = mixture.iter().map(|&(_, p)| p).sum();
            assert!(sum <= 1.0 + 1e-6);
            assert!(mixture.iter().all(|&(k, p)| k < 4 && p >= 0.01));
        }
    }

    #[test]
    fn log_perplexity_is_non_positive() {
        let corpus = two_group_corpus();
        let model = LdaBackend::default().fit(&corpus, 6, &training(false, 2)).unwrap();
        let score = model.log_perplexity(&corpus).unwrap();
        assert!(score <= 0.0 && score.is_finite());

        let err = model.log_perplexity(&BowCorpus::new()).unwrap_err();
        assert!(matches!(err, PipelineError::DataIntegrity(_)));
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model-1.lda");
        let model = LdaBackend::default().fit(&two_group_corpus(), 6, &training(false, 2)).unwrap();
        model.save(&path).unwrap();
        let loaded = LdaModel::load(&path).unwrap();
        assert_eq!(model, loaded);
        assert_eq!(model.infer(&[(1, 3)]), loaded.infer(&[(1, 3)]));
    }

    #[test]
    fn loading_garbage_is_a_codec_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model-2.lda");
        std::fs::write(&path, b"not cbor at all").unwrap();
        assert!(LdaModel::load(&path).is_err());
    }
}
