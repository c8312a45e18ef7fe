use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[clap(about = "Builds continuation-passing block graphs from analyzed programs")]
pub struct Options {
    #[clap(subcommand)]
    pub operation: Operation,
    /// Log verbosity: 0 for errors only, up to 4 for every emitted instruction
    #[clap(short, long, default_value_t = 1)]
    pub verbose: usize,
}

#[derive(Debug, Subcommand)]
pub enum Operation {
    /// List the bundled programs
    List,
    /// Build the block graph of a bundled program and print its listing
    Build {
        demo: String,
        #[clap(flatten)]
        backend: BackendOptions,
    },
}

#[derive(Debug, Args)]
pub struct BackendOptions {
    #[clap(long)]
    /// Do not remove mirror instructions
    no_optimise: bool,
    #[clap(long)]
    /// Do not check the finished graph
    no_verify: bool,
}

impl BackendOptions {
    pub fn optimise(&self) -> bool {
        !self.no_optimise
    }

    pub fn verify(&self) -> bool {
        !self.no_verify
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_defaults_to_warnings() {
        let options = Options::parse_from(["cubc", "list"]);
        assert_eq!(1, options.verbose);
        assert!(matches!(options.operation, Operation::List));
    }

    #[test]
    fn backend_passes_can_be_disabled() {
        let options = Options::parse_from(["cubc", "-v", "3", "build", "calls", "--no-optimise"]);
        assert_eq!(3, options.verbose);
        match options.operation {
            Operation::Build { demo, backend } => {
                assert_eq!("calls", demo);
                assert!(!backend.optimise());
                assert!(backend.verify());
            }
            other => panic!("expected a build, found {:?}", other),
        }
    }
}
