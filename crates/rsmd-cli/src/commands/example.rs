use crate::cli::ExampleArgs;
use crate::error::Result;
use rsmd::core::io::reaction::ReactionParser;
use tracing::info;

pub fn run(args: ExampleArgs) -> Result<()> {
    let example = ReactionParser::example();
    match &args.output {
        Some(path) => {
            std::fs::write(path, &example)?;
            info!("Wrote example reaction file to {:?}", path);
            println!("Example reaction file written to: {}", path.display());
        }
        None => print!("{example}"),
    }
    Ok(())
}
