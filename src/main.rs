#[macro_use]
extern crate lazy_static;

mod cli_config;
mod common;
mod docs_config;
mod errors;
mod logger;
mod note;
mod notebook;
mod notebook_config;
mod program_actions;
mod templates;

use std::{
  env,
  path::{Path, PathBuf}
};

use clap::Parser;

use cli_config::clap_cli_config::{DocsSubcommand, Opts, SubCommandStruct, TagSubcommand};
use errors::ZkResult;
use notebook_config::{open_global_config, Config};
use program_actions::{docs_actions, CommandContext};

fn main() {
  let opts: Opts = Opts::parse();

  logger::configure_colors(opts.no_color);
  logger::set_verbose(opts.verbose);

  if let Err(err) = run(opts) {
    logger::exit_error_log(err.to_string());
  }
}

fn run_alias(context: &CommandContext, alias_args: &[String]) -> ZkResult<()> {
  let (alias_name, rest) = match alias_args.split_first() {
    Some(split) => split,
    None => return Ok(())
  };

  // Aliases may come from the global config when there is no notebook around.
  let (config, notebook_root): (Config, Option<PathBuf>) = match context.open_notebook() {
    Ok(notebook) => (notebook.config, Some(notebook.root)),
    Err(_) => (open_global_config()?, None)
  };

  return program_actions::run_alias(
    &config,
    alias_name,
    rest,
    notebook_root.as_deref(),
    &context.working_dir
  );
}

fn run(opts: Opts) -> ZkResult<()> {
  let working_dir: PathBuf = env::current_dir()?;
  let context = CommandContext {
    working_dir,
    notebook_dir_flag: opts.notebook_dir.as_ref().map(PathBuf::from)
  };
  let working_dir: &Path = &context.working_dir;

  return match &opts.subcommand {
    SubCommandStruct::Init(command) => program_actions::init(&context, command),
    SubCommandStruct::Index(command) => program_actions::index(&context, command),
    SubCommandStruct::List(command) => program_actions::list(&context, command),
    SubCommandStruct::Tag(TagSubcommand::List(command)) => program_actions::tag_list(&context, command),
    SubCommandStruct::Graph(command) => program_actions::graph(&context, command),
    SubCommandStruct::New(command) => program_actions::new(&context, command),
    SubCommandStruct::Edit(command) => program_actions::edit(&context, command),
    SubCommandStruct::Docs(docs_command) => match docs_command {
      DocsSubcommand::Check(command) => docs_actions::check(working_dir, command),
      DocsSubcommand::Show(command) => docs_actions::show(working_dir, command),
      DocsSubcommand::Diff(command) => docs_actions::diff(working_dir, command),
      DocsSubcommand::Gen(command) => docs_actions::generate(working_dir, command),
      DocsSubcommand::Keys => docs_actions::keys()
    },
    SubCommandStruct::Alias(alias_args) => run_alias(&context, alias_args)
  }
}
