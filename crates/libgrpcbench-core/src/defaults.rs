//! Process-derived defaults injected into the assembler

use std::fmt;
use std::num::NonZeroUsize;
use std::sync::Arc;

use rand::seq::SliceRandom;
use rand::Rng;

const ADJECTIVES: &[&str] = &[
    "amber", "brave", "calm", "dapper", "eager", "fancy", "gentle", "happy", "icy", "jolly",
    "keen", "lively", "mellow", "nimble", "odd", "plucky", "quiet", "rapid", "sunny", "tidy",
    "upbeat", "vivid", "witty", "young", "zesty",
];

const NOUNS: &[&str] = &[
    "badger", "comet", "dolphin", "falcon", "gecko", "heron", "iguana", "jaguar", "koala",
    "lemur", "marmot", "newt", "otter", "panda", "quokka", "raven", "salmon", "tapir", "urchin",
    "viper", "walrus", "yak", "zebra",
];

/// Source of default run names
pub trait NameGenerator: Send + Sync {
    fn generate(&self) -> String;
}

impl<F> NameGenerator for F
where
    F: Fn() -> String + Send + Sync,
{
    fn generate(&self) -> String {
        self()
    }
}

/// Random human-readable names like `plucky-otter-42`
#[derive(Debug, Clone, Copy, Default)]
pub struct ReadableNames;

impl NameGenerator for ReadableNames {
    fn generate(&self) -> String {
        let mut rng = rand::thread_rng();
        let adjective = ADJECTIVES.choose(&mut rng).copied().unwrap_or("brave");
        let noun = NOUNS.choose(&mut rng).copied().unwrap_or("otter");
        let suffix: u16 = rng.gen_range(0..10_000);
        format!("{}-{}-{}", adjective, noun, suffix)
    }
}

/// Defaults that would otherwise be read from process-wide state
#[derive(Clone)]
pub struct RunDefaults {
    cpus: usize,
    names: Arc<dyn NameGenerator>,
}

impl RunDefaults {
    pub fn new(cpus: usize, names: impl NameGenerator + 'static) -> Self {
        Self {
            cpus,
            names: Arc::new(names),
        }
    }

    /// Defaults taken from the running process: available parallelism and random names
    pub fn from_process() -> Self {
        let cpus = std::thread::available_parallelism()
            .map(NonZeroUsize::get)
            .unwrap_or(1);
        Self::new(cpus, ReadableNames)
    }

    pub fn cpus(&self) -> usize {
        self.cpus
    }

    pub fn generate_name(&self) -> String {
        self.names.generate()
    }
}

impl Default for RunDefaults {
    fn default() -> Self {
        Self::from_process()
    }
}

impl fmt::Debug for RunDefaults {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunDefaults")
            .field("cpus", &self.cpus)
            .finish_non_exhaustive()
    }
}
