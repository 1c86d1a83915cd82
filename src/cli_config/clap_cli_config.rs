use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::docs_config::DEFAULT_CONF_PY_PATH;

#[derive(Parser)]
#[clap(name = "zk", version, about = "A plain text note-taking assistant")]
pub struct Opts {
  /// Turn off the colors in the output.
  #[clap(long, global = true)]
  pub no_color: bool,

  /// Print more information about what zk is doing.
  #[clap(short = 'v', long, global = true)]
  pub verbose: bool,

  /// Run the command as if zk was started in this notebook.
  #[clap(long, short = 'N', global = true, value_name = "DIR")]
  pub notebook_dir: Option<String>,

  #[clap(subcommand)]
  pub subcommand: SubCommandStruct
}

#[derive(Subcommand)]
pub enum SubCommandStruct {
  /// Create a new notebook in the given directory.
  Init(InitCommand),

  /// Index the notes to be searchable.
  Index(IndexCommand),

  /// List notes matching the given criteria.
  List(ListCommand),

  /// Manage the note tags.
  #[clap(subcommand)]
  Tag(TagSubcommand),

  /// Print the links between notes as JSON.
  Graph(GraphCommand),

  /// Create a new note in the given notebook directory.
  New(NewCommand),

  /// Edit notes matching the given criteria.
  Edit(EditCommand),

  /// Check, print, compare and generate the documentation `conf.py`.
  #[clap(subcommand)]
  Docs(DocsSubcommand),

  /// An alias defined in the `[alias]` config section.
  #[clap(external_subcommand)]
  Alias(Vec<String>)
}

#[derive(Args)]
pub struct InitCommand {
  /// Directory of the new notebook.
  #[clap(default_value = ".")]
  pub directory: String,

  /// Generate links as [[wiki links]].
  #[clap(long)]
  pub wiki_links: bool,

  /// Do not parse #hashtags.
  #[clap(long)]
  pub no_hashtags: bool,

  /// Parse :colon:tags:.
  #[clap(long)]
  pub colon_tags: bool,

  /// Parse Bear's #multi-word tags#.
  #[clap(long)]
  pub multiword_tags: bool
}

#[derive(Args)]
pub struct IndexCommand {
  /// Force indexing all the notes.
  #[clap(short, long)]
  pub force: bool,

  /// Do not print statistics nor progress.
  #[clap(short, long)]
  pub quiet: bool
}

/// Criteria shared by the commands working on a selection of notes.
#[derive(Args, Clone, Default)]
pub struct FilterArgs {
  /// Find notes under these paths, or named filters from the config.
  pub paths: Vec<String>,

  /// Terms to search for in the notes.
  #[clap(long = "match", short = 'm', value_name = "QUERY")]
  pub match_strings: Vec<String>,

  /// Search for the exact phrase instead of separate terms.
  #[clap(long, short = 'e')]
  pub exact_match: bool,

  /// Ignore notes under these paths.
  #[clap(long, short = 'x', value_name = "PATH")]
  pub exclude: Vec<String>,

  /// Read the paths and exclusions as regular expressions.
  #[clap(long)]
  pub path_regex: bool,

  /// Find notes tagged with these tags. Supports `a OR b`, `a|b`, `-a` and `NOT a`.
  #[clap(long, short = 't', value_name = "TAGS")]
  pub tag: Vec<String>,

  /// Find notes linking to these notes.
  #[clap(long, short = 'l', value_name = "PATH")]
  pub link_to: Vec<String>,

  /// Find notes linked by these notes.
  #[clap(long, short = 'L', value_name = "PATH")]
  pub linked_by: Vec<String>,

  /// Find notes which are not linking to these notes.
  #[clap(long, value_name = "PATH", conflicts_with = "link_to")]
  pub no_link_to: Vec<String>,

  /// Find notes which are not linked by these notes.
  #[clap(long, value_name = "PATH", conflicts_with = "linked_by")]
  pub no_linked_by: Vec<String>,

  /// Find notes which might be related to these ones.
  #[clap(long, value_name = "PATH")]
  pub related: Vec<String>,

  /// Find notes mentioning the title of these ones.
  #[clap(long, value_name = "PATH", conflicts_with = "exact_match")]
  pub mention: Vec<String>,

  /// Find notes whose title is mentioned in these ones.
  #[clap(long, value_name = "PATH")]
  pub mentioned_by: Vec<String>,

  /// Follow links recursively.
  #[clap(long, short = 'r')]
  pub recursive: bool,

  /// Maximum distance between two linked notes when following links recursively.
  #[clap(long, value_name = "COUNT")]
  pub max_distance: Option<usize>,

  /// Find notes which are not linked by any other note.
  #[clap(long)]
  pub orphan: bool,

  /// Find notes created on this date.
  #[clap(long, value_name = "DATE", conflicts_with_all = ["created_before", "created_after"])]
  pub created: Option<String>,

  /// Find notes created before this date.
  #[clap(long, value_name = "DATE")]
  pub created_before: Option<String>,

  /// Find notes created after this date.
  #[clap(long, value_name = "DATE")]
  pub created_after: Option<String>,

  /// Find notes modified on this date.
  #[clap(long, value_name = "DATE", conflicts_with_all = ["modified_before", "modified_after"])]
  pub modified: Option<String>,

  /// Find notes modified before this date.
  #[clap(long, value_name = "DATE")]
  pub modified_before: Option<String>,

  /// Find notes modified after this date.
  #[clap(long, value_name = "DATE")]
  pub modified_after: Option<String>,

  /// Order the notes by created, modified, path, title, random or word-count, with an optional + or - suffix.
  #[clap(long, short = 's', value_name = "TERM")]
  pub sort: Vec<String>,

  /// Limit the number of notes found.
  #[clap(long, short = 'n', value_name = "COUNT")]
  pub limit: Option<usize>
}

/// Parses the flags stored in a `[filter]` config entry.
#[derive(Parser)]
#[clap(no_binary_name = true)]
pub struct NamedFilterArgs {
  #[clap(flatten)]
  pub filter: FilterArgs
}

#[derive(Args)]
pub struct ListCommand {
  #[clap(flatten)]
  pub filter: FilterArgs,

  /// path, link, oneline, short, medium, long, full, json, jsonl or a Handlebars template.
  #[clap(long, short = 'f', default_value = "short")]
  pub format: String,

  /// Print notes delimited by the given separator.
  #[clap(long, short = 'd', default_value = "\n")]
  pub delimiter: String,

  /// Print notes delimited by ASCII NUL characters.
  #[clap(long = "delimiter0", short = '0')]
  pub delimiter0: bool,

  /// Do not print the total number of notes found.
  #[clap(long, short = 'q')]
  pub quiet: bool
}

#[derive(ValueEnum, Clone, Copy, PartialEq, Eq)]
pub enum TagSortIn {
  Name,
  NoteCount
}

#[derive(ValueEnum, Clone, Copy, PartialEq, Eq)]
pub enum TagFormatIn {
  Name,
  Count,
  Json
}

#[derive(Subcommand)]
pub enum TagSubcommand {
  /// List all the note tags.
  List(TagListCommand)
}

#[derive(Args)]
pub struct TagListCommand {
  /// Order the tags by name or by the number of notes using them.
  #[clap(value_enum, long, short = 's', default_value = "name")]
  pub sort: TagSortIn,

  #[clap(value_enum, long, short = 'f', default_value = "count")]
  pub format: TagFormatIn,

  /// Do not print the total number of tags found.
  #[clap(long, short = 'q')]
  pub quiet: bool
}

#[derive(Args)]
pub struct GraphCommand {
  #[clap(flatten)]
  pub filter: FilterArgs
}

#[derive(Args)]
pub struct NewCommand {
  /// Directory in which to create the note.
  #[clap(default_value = ".")]
  pub directory: String,

  /// Title of the new note.
  #[clap(long, short = 't')]
  pub title: Option<String>,

  /// Name of the config group this note belongs to.
  #[clap(long, short = 'g')]
  pub group: Option<String>,

  /// Extra template variables, as key=value.
  #[clap(long, value_name = "KEY=VALUE")]
  pub extra: Vec<String>,

  /// Print the path of the created note instead of its content.
  #[clap(long, short = 'p')]
  pub print_path: bool,

  /// Do not write the note, print its content instead.
  #[clap(long, short = 'n')]
  pub dry_run: bool
}

#[derive(Args)]
pub struct EditCommand {
  #[clap(flatten)]
  pub filter: FilterArgs,

  /// Do not ask before opening many notes.
  #[clap(long, short = 'f')]
  pub force: bool
}

#[derive(ValueEnum, Clone, Copy, PartialEq, Eq)]
pub enum DocsFormatIn {
  Yaml,
  Json,
  ConfPy
}

#[derive(Subcommand)]
pub enum DocsSubcommand {
  /// Check a conf.py against the documentation requirements.
  Check(DocsCheckCommand),

  /// Print a conf.py, or a built-in revision, as YAML, JSON or Python.
  Show(DocsShowCommand),

  /// Print what changed between two conf.py files or revisions.
  Diff(DocsDiffCommand),

  /// Write a conf.py from a built-in revision.
  Gen(DocsGenCommand),

  /// List the recognized conf.py keys.
  Keys
}

#[derive(Args)]
pub struct DocsCheckCommand {
  #[clap(default_value = DEFAULT_CONF_PY_PATH)]
  pub path: String
}

#[derive(Args)]
pub struct DocsShowCommand {
  #[clap(default_value = DEFAULT_CONF_PY_PATH)]
  pub path: String,

  #[clap(value_enum, long, short = 'f', default_value = "yaml")]
  pub format: DocsFormatIn,

  /// Show a built-in revision instead of reading a file.
  #[clap(long)]
  pub revision: Option<String>
}

#[derive(Args)]
pub struct DocsDiffCommand {
  /// Path of a conf.py or a built-in revision name.
  pub before: String,

  /// Path of a conf.py or a built-in revision name.
  pub after: String
}

#[derive(Args)]
pub struct DocsGenCommand {
  /// Directory receiving conf.py.
  #[clap(default_value = "docs")]
  pub directory: String,

  /// Built-in revision to write. Defaults to the latest one.
  #[clap(long)]
  pub revision: Option<String>,

  /// Overwrite an existing conf.py without asking.
  #[clap(long, short = 'y')]
  pub yes: bool
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn docs_commands_default_to_the_docs_conf_py() {
    let opts: Opts = Opts::try_parse_from(["zk", "docs", "check"]).unwrap();
    match opts.subcommand {
      SubCommandStruct::Docs(DocsSubcommand::Check(command)) => assert_eq!(command.path, DEFAULT_CONF_PY_PATH),
      _ => panic!("expected the docs check command")
    }

    let opts: Opts = Opts::try_parse_from(["zk", "docs", "show", "-f", "json"]).unwrap();
    match opts.subcommand {
      SubCommandStruct::Docs(DocsSubcommand::Show(command)) => assert_eq!(command.path, DEFAULT_CONF_PY_PATH),
      _ => panic!("expected the docs show command")
    }
  }

  #[test]
  fn negated_and_plain_link_filters_conflict() {
    assert!(Opts::try_parse_from(["zk", "list", "--link-to", "a", "--no-link-to", "b"]).is_err());
    assert!(Opts::try_parse_from(["zk", "list", "--created", "today", "--created-after", "yesterday"]).is_err());
    assert!(Opts::try_parse_from(["zk", "list", "--no-linked-by", "a", "--related", "b", "--mentioned-by", "c"]).is_ok());
  }
}
