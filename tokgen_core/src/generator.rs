use crate::config::{GeneratorSettings, Strategy};
use crate::token::{Token, TokenError, is_enumerable_all};
use rand_chacha::ChaCha8Rng;
use rand_core::SeedableRng;
use std::collections::HashSet;

/// One rendered instance of a token tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    /// 1-based iteration index: the fuzz round or the permutation index.
    pub index: u64,
    pub text: String,
}

/// Produces artifacts from a token tree on one or more worker threads.
///
/// Each worker owns a deep clone of the tree and a `ChaCha8Rng` seeded with
/// `seed + worker`, and handles every `threads`-th index. Output is therefore
/// reproducible for a fixed seed and thread count.
#[derive(Debug, Clone)]
pub struct Generator {
    settings: GeneratorSettings,
}

impl Generator {
    pub fn new(settings: GeneratorSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &GeneratorSettings {
        &self.settings
    }

    /// Generates artifacts with the configured strategy.
    pub fn run(&self, root: &dyn Token) -> Result<Vec<Artifact>, TokenError> {
        match self.settings.strategy {
            Strategy::Fuzz => self.fuzz(root),
            Strategy::Permutations => self.enumerate(root),
        }
    }

    /// Renders `count` independently fuzzed instances of `root`.
    pub fn fuzz(&self, root: &dyn Token) -> Result<Vec<Artifact>, TokenError> {
        self.generate(root, self.settings.count, |tree, rng, _index| {
            tree.fuzz_all(rng);
            tree.render()
        })
    }

    /// Renders the first `count` permutations of `root` in index order.
    pub fn enumerate(&self, root: &dyn Token) -> Result<Vec<Artifact>, TokenError> {
        if !is_enumerable_all(root) {
            tracing::warn!(
                root = %root.id(),
                kind = root.kind(),
                "tree contains fuzz-only tokens, their permutations are placeholders"
            );
        }

        let total = self.settings.count.min(root.permutations_all());
        self.generate(root, total, |tree, _rng, index| {
            tree.permutation_all(index)?;
            tree.render()
        })
    }

    fn generate<F>(
        &self,
        root: &dyn Token,
        total: u64,
        job: F,
    ) -> Result<Vec<Artifact>, TokenError>
    where
        F: Fn(&mut dyn Token, &mut ChaCha8Rng, u64) -> Result<String, TokenError> + Sync,
    {
        let threads = self.settings.threads.max(1);
        let workers = u64::try_from(threads).unwrap_or(u64::MAX).min(total.max(1));
        let seed = self.settings.seed;

        tracing::debug!(
            root = %root.id(),
            strategy = ?self.settings.strategy,
            total,
            workers,
            seed,
            "generating artifacts"
        );

        let job = &job;
        let results: Vec<Result<Vec<Artifact>, TokenError>> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..workers)
                .map(|worker| {
                    let mut tree = root.clone_token();
                    scope.spawn(move || -> Result<Vec<Artifact>, TokenError> {
                        let mut rng = ChaCha8Rng::seed_from_u64(seed.wrapping_add(worker));
                        let mut produced = Vec::new();
                        for index in (worker + 1..=total).step_by(threads) {
                            let text = job(&mut *tree, &mut rng, index)?;
                            produced.push(Artifact { index, text });
                        }
                        Ok(produced)
                    })
                })
                .collect();

            handles
                .into_iter()
                .map(|handle| {
                    handle.join().unwrap_or_else(|_| {
                        Err(TokenError::Internal("generation worker panicked".to_string()))
                    })
                })
                .collect()
        });

        let mut artifacts = Vec::new();
        for result in results {
            artifacts.extend(result?);
        }
        artifacts.sort_by_key(|artifact| artifact.index);

        if self.settings.unique {
            let before = artifacts.len();
            let mut known_hashes: HashSet<[u8; 16]> = HashSet::new();
            artifacts.retain(|artifact| {
                known_hashes.insert(md5::compute(artifact.text.as_bytes()).0)
            });
            tracing::debug!(dropped = before - artifacts.len(), "dropped repeated artifacts");
        }

        tracing::debug!(produced = artifacts.len(), "generation finished");
        Ok(artifacts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arithmetic::Arithmetic;
    use crate::least::Least;
    use crate::primitives::{ConstantInt, RandomInt, RangeInt};

    fn settings(strategy: Strategy, count: u64, threads: usize) -> GeneratorSettings {
        GeneratorSettings {
            strategy,
            count,
            threads,
            ..GeneratorSettings::default()
        }
    }

    fn texts(artifacts: &[Artifact]) -> Vec<&str> {
        artifacts.iter().map(|artifact| artifact.text.as_str()).collect()
    }

    fn indices(artifacts: &[Artifact]) -> Vec<u64> {
        artifacts.iter().map(|artifact| artifact.index).collect()
    }

    fn init_tracing() {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    }

    fn bits() -> Least {
        Least::with_max_extra(Box::new(RangeInt::new(0, 1).unwrap()), 0, 2)
    }

    #[test]
    fn fuzz_produces_count_artifacts() {
        let generator = Generator::new(settings(Strategy::Fuzz, 5, 1));
        let artifacts = generator.fuzz(&ConstantInt::new(42)).unwrap();
        assert_eq!(indices(&artifacts), vec![1, 2, 3, 4, 5]);
        assert!(artifacts.iter().all(|artifact| artifact.text == "42"));
    }

    #[test]
    fn fuzz_is_reproducible_per_seed() {
        let root = RangeInt::new(0, 1_000_000).unwrap();
        let mut first = settings(Strategy::Fuzz, 20, 2);
        first.seed = 7;
        let again = Generator::new(first.clone()).fuzz(&root).unwrap();
        let once = Generator::new(first.clone()).fuzz(&root).unwrap();
        assert_eq!(once, again);

        first.seed = 8;
        let other = Generator::new(first).fuzz(&root).unwrap();
        assert_ne!(once, other);
    }

    #[test]
    fn fuzz_leaves_root_untouched() {
        let root = Least::new(Box::new(RandomInt::new()), 1);
        let before = root.render().unwrap();
        Generator::new(settings(Strategy::Fuzz, 10, 3)).fuzz(&root).unwrap();
        assert_eq!(root.render().unwrap(), before);
    }

    #[test]
    fn workers_cover_every_index_in_order() {
        let generator = Generator::new(settings(Strategy::Fuzz, 10, 3));
        let artifacts = generator.fuzz(&RangeInt::new(0, 9).unwrap()).unwrap();
        assert_eq!(indices(&artifacts), (1..=10).collect::<Vec<_>>());
    }

    #[test]
    fn zero_threads_runs_one_worker() {
        let generator = Generator::new(settings(Strategy::Fuzz, 3, 0));
        assert_eq!(generator.fuzz(&ConstantInt::new(1)).unwrap().len(), 3);
    }

    #[test]
    fn enumerate_walks_permutations_in_order() {
        init_tracing();
        let expected = vec!["", "0", "1", "00", "10", "01", "11"];
        for threads in [1, 2, 4] {
            let generator = Generator::new(settings(Strategy::Permutations, 100, threads));
            let artifacts = generator.enumerate(&bits()).unwrap();
            assert_eq!(texts(&artifacts), expected, "with {threads} threads");
            assert_eq!(indices(&artifacts), (1..=7).collect::<Vec<_>>());
        }
    }

    #[test]
    fn enumerate_stops_at_count() {
        let generator = Generator::new(settings(Strategy::Permutations, 3, 1));
        let artifacts = generator.enumerate(&bits()).unwrap();
        assert_eq!(texts(&artifacts), vec!["", "0", "1"]);
    }

    #[test]
    fn unique_drops_repeated_renders() {
        init_tracing();
        // 0+0, 1+0, 0+1, 1+1
        let sum = Arithmetic::add(
            Box::new(RangeInt::new(0, 1).unwrap()),
            Box::new(RangeInt::new(0, 1).unwrap()),
        );
        let mut unique = settings(Strategy::Permutations, 100, 2);
        unique.unique = true;
        let artifacts = Generator::new(unique).run(&sum).unwrap();
        assert_eq!(texts(&artifacts), vec!["0", "1", "2"]);
        assert_eq!(indices(&artifacts), vec![1, 2, 4]);

        let mut constant = settings(Strategy::Fuzz, 50, 1);
        constant.unique = true;
        let artifacts = Generator::new(constant).run(&ConstantInt::new(3)).unwrap();
        assert_eq!(indices(&artifacts), vec![1]);
    }

    #[test]
    fn run_dispatches_on_strategy() {
        let root = RangeInt::new(5, 7).unwrap();
        let artifacts = Generator::new(settings(Strategy::Permutations, 10, 1))
            .run(&root)
            .unwrap();
        assert_eq!(texts(&artifacts), vec!["5", "6", "7"]);

        let artifacts = Generator::new(settings(Strategy::Fuzz, 10, 1)).run(&root).unwrap();
        assert_eq!(artifacts.len(), 10);
    }

    #[test]
    fn render_failures_abort_generation() {
        let broken = Arithmetic::div(Box::new(ConstantInt::new(1)), Box::new(ConstantInt::new(0)));
        let err = Generator::new(settings(Strategy::Fuzz, 4, 2))
            .fuzz(&broken)
            .unwrap_err();
        assert!(err.is_fatal());
    }
}
