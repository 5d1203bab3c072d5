use std::fmt::{Debug, Display};

/// Ranked (key, score) list, e.g. the terms of a topic.
#[derive(Clone, PartialEq)]
pub struct Ranked<K> {
    /// (key, score)
    pub list: Vec<(K, f64)>,
}

impl<K> Ranked<K> {
    pub fn new(list: Vec<(K, f64)>) -> Self {
        Ranked { list }
    }

    /// Sort results by descending score.
    /// Equal scores keep their input order.
    pub fn sort_by_score(&mut self) -> &mut Self {
        // Remove NaN scores
        self.list.retain(|(_, s)| !s.is_nan());
        self.list.sort_by(|a, b| b.1.total_cmp(&a.1));
        self
    }

    /// Keep the first `n` entries.
    pub fn top(&mut self, n: usize) -> &mut Self {
        self.list.truncate(n);
        self
    }

    pub fn len(&self) -> usize {
        self.list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    pub fn into_inner(self) -> Vec<(K, f64)> {
        self.list
    }
}

impl<K> Debug for Ranked<K>
where
    K: Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if f.alternate() {
            writeln!(f, "Ranked [")?;
            for (key, score) in &self.list {
                writeln!(f, "    {:?}: {:.6}", key, score)?;
            }
            write!(f, "]")
        } else {
            f.debug_list().entries(&self.list).finish()
        }
    }
}

/// `0.120*"storm" + 0.080*"rain"`
impl<K> Display for Ranked<K>
where
    K: Display,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, (key, score)) in self.list.iter().enumerate() {
            if i > 0 {
                write!(f, " + ")?;
            }
            write!(f, "{:.3}*\"{}\"", score, key)?;
        }
        Ok(())
    }
}
