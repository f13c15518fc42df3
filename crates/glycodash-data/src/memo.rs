//! Dependency-tracked memoization for derived views.
//!
//! Each view is identified by a stable id and declares its input as a value.
//! A view is recomputed only when its input snapshot differs from the one its
//! cached output was computed from. Failures are never cached.

use std::collections::HashMap;
use std::future::Future;

#[derive(Debug)]
pub struct ViewMemo<I, O> {
    entries: HashMap<String, (I, O)>,
}

impl<I, O> Default for ViewMemo<I, O> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }
}

impl<I, O> ViewMemo<I, O>
where
    I: PartialEq + Clone,
    O: Clone,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached output for `view`, if it was computed from exactly `input`.
    pub fn get(&self, view: &str, input: &I) -> Option<O> {
        self.entries
            .get(view)
            .filter(|(snapshot, _)| snapshot == input)
            .map(|(_, output)| output.clone())
    }

    /// Return the cached output or run `compute` and remember its success.
    pub async fn get_or_compute<E, F, Fut>(&mut self, view: &str, input: &I, compute: F) -> Result<O, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<O, E>>,
    {
        if let Some(output) = self.get(view, input) {
            return Ok(output);
        }
        let output = compute().await?;
        self.entries
            .insert(view.to_string(), (input.clone(), output.clone()));
        Ok(output)
    }

    pub fn invalidate(&mut self, view: &str) {
        self.entries.remove(view);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_recomputes_only_on_changed_input() {
        let mut memo: ViewMemo<String, usize> = ViewMemo::new();
        let mut calls = 0;

        for input in ["Hex", "Hex", "Fuc", "Fuc", "Hex"] {
            let input = input.to_string();
            let len = memo
                .get_or_compute("chart", &input, || {
                    calls += 1;
                    let n = input.len();
                    async move { Ok::<_, ()>(n) }
                })
                .await
                .unwrap();
            assert_eq!(len, 3);
        }
        assert_eq!(calls, 3);
    }

    #[tokio::test]
    async fn test_views_are_keyed_independently() {
        let mut memo: ViewMemo<u32, u32> = ViewMemo::new();
        memo.get_or_compute("a", &1, || async { Ok::<_, ()>(10) }).await.unwrap();
        memo.get_or_compute("b", &1, || async { Ok::<_, ()>(20) }).await.unwrap();
        assert_eq!(memo.get("a", &1), Some(10));
        assert_eq!(memo.get("b", &1), Some(20));
        assert_eq!(memo.get("a", &2), None);
        memo.invalidate("a");
        assert_eq!(memo.get("a", &1), None);
        assert_eq!(memo.len(), 1);
    }

    #[tokio::test]
    async fn test_failures_are_not_cached() {
        let mut memo: ViewMemo<u32, u32> = ViewMemo::new();
        let err = memo
            .get_or_compute("a", &1, || async { Err::<u32, _>("boom") })
            .await;
        assert_eq!(err, Err("boom"));
        assert!(memo.is_empty());
    }
}
