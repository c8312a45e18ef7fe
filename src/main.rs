use clap::Parser;

use cubc::{
    commandline::{BackendOptions, Operation, Options},
    demos, il,
    prelude::*,
};

fn main() -> Result<()> {
    let options = Options::parse();
    stderrlog::new()
        .module("cubc")
        .verbosity(options.verbose)
        .init()?;

    match options.operation {
        Operation::List => {
            for (name, description) in demos::names() {
                println!("{name:<10} {description}");
            }
            Ok(())
        }
        Operation::Build { demo, backend } => build(&demo, &backend),
    }
}

fn build(demo: &str, backend: &BackendOptions) -> Result<()> {
    let program = demos::load(demo)?;
    let mut generated = il::generate(&program);
    for (id, function) in generated.functions.iter() {
        info!(
            "Function {id:?} '{}' enters at {} and returns through {}",
            function.name, function.entry, function.return_struct
        );
    }

    if backend.optimise() {
        il::optimise(&mut generated.system);
    }
    if backend.verify() {
        if let Err(errors) = il::verify(&generated.system, &generated.entries()) {
            for err in errors.iter() {
                error!("{err}");
            }
            bail!("Block graph of '{demo}' failed verification with {} error(s)", errors.len());
        }
    }

    print!("{}", generated.system);
    Ok(())
}
