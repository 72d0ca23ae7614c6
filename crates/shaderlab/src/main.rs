mod check;
mod cli;
mod paths;
mod run;
mod settings;
mod template;

use std::process::ExitCode;

use anyhow::Result;
use cli::{Command, TemplateAction};

fn main() -> Result<ExitCode> {
    let cli = cli::parse();
    run::initialise_tracing();

    match cli.command {
        Command::Preview(args) => run::preview(args)?,
        Command::Check(args) => {
            if !run::check(args)? {
                return Ok(ExitCode::FAILURE);
            }
        }
        Command::Template(template_cmd) => match template_cmd.action {
            TemplateAction::List => template::list(),
            TemplateAction::Write { id, out, force } => {
                for path in template::write(&id, &out, force)? {
                    println!("wrote {}", path.display());
                }
            }
        },
        Command::Where => run::describe_paths()?,
    }

    Ok(ExitCode::SUCCESS)
}
