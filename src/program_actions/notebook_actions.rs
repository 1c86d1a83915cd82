use std::{
  io::{self, IsTerminal, Read, Write},
  path::{Path, PathBuf}
};

use chrono::Utc;
use colored::Colorize;
use serde::Serialize;

use crate::{
  cli_config::{
    clap_cli_config::{
      EditCommand,
      FilterArgs,
      GraphCommand,
      IndexCommand,
      InitCommand,
      ListCommand,
      NewCommand,
      TagListCommand
    },
    find_opts_from_args,
    parse_extra_values,
    ListOptions,
    TagFormat,
    TagListOptions,
    TagSort
  },
  common::{pluralize, prompt::prompt_until_boolean},
  errors::ZkResult,
  logger,
  note::LinkType,
  notebook::{
    init_notebook,
    note_find::{find_notes, MatchedNote, NoteFindOpts},
    note_format::{NoteFormat, NoteFormatter, NoteJson},
    note_index::{index_notebook, NoteIndex, NoteIndexingStats},
    note_new::{new_note, NewNote, NewNoteOpts},
    open_notebook,
    Notebook
  },
  notebook_config::InitConfigOptions,
  templates::TemplateError
};

use super::external_commands::{editor_of, open_in_editor};

/// Opening more notes than this asks for confirmation.
const EDIT_CONFIRMATION_THRESHOLD: usize = 5;

/// Where a command runs from.
pub struct CommandContext {
  pub working_dir: PathBuf,
  pub notebook_dir_flag: Option<PathBuf>
}

impl CommandContext {
  pub fn open_notebook(&self) -> ZkResult<Notebook> {
    return Ok(open_notebook(self.notebook_dir_flag.as_deref(), &self.working_dir)?);
  }
}

/// Brings the index up to date before a query.
fn refreshed_index(notebook: &Notebook) -> ZkResult<NoteIndex> {
  let (index, _) = index_notebook(notebook, false, |change| logger::verbose(change.to_string()))?;
  return Ok(index);
}

pub fn init(context: &CommandContext, command: &InitCommand) -> ZkResult<()> {
  let options: InitConfigOptions = InitConfigOptions::from(command);
  let notebook: Notebook = init_notebook(&context.working_dir.join(&command.directory), &options)?;

  println!("Initialized a notebook in {}", notebook.root.to_string_lossy().green());
  return Ok(());
}

pub fn index(context: &CommandContext, command: &IndexCommand) -> ZkResult<()> {
  let notebook: Notebook = context.open_notebook()?;
  let (_, stats): (NoteIndex, NoteIndexingStats) = index_notebook(
    &notebook,
    command.force,
    |change| logger::verbose(change.to_string())
  )?;

  if !command.quiet {
    println!("{}", stats);
  }

  return Ok(());
}

fn find_with(
  context: &CommandContext,
  notebook: &Notebook,
  filter: &FilterArgs
) -> ZkResult<(NoteIndex, NoteFindOpts)> {
  let find_opts: NoteFindOpts = find_opts_from_args(filter.clone(), notebook, &context.working_dir, Utc::now())?;
  let index: NoteIndex = refreshed_index(notebook)?;
  return Ok((index, find_opts));
}

pub fn list(context: &CommandContext, command: &ListCommand) -> ZkResult<()> {
  let notebook: Notebook = context.open_notebook()?;
  let options: ListOptions = ListOptions::from(command);
  let (index, find_opts) = find_with(context, &notebook, &command.filter)?;
  let notes: Vec<MatchedNote> = find_notes(&index, &find_opts, &notebook.config.note.extension)?;

  let formatter: NoteFormatter = NoteFormatter::new(options.format.clone(), &notebook, &context.working_dir)?;
  let formatted: Vec<String> = match &options.format {
    NoteFormat::Json => vec![serde_json::to_string(
      &notes.iter().map(|matched| formatter.json_of(matched)).collect::<Result<Vec<NoteJson>, TemplateError>>()?
    )?],
    _ => notes.iter().map(|matched| formatter.format(matched)).collect::<Result<Vec<String>, TemplateError>>()?
  };

  let mut stdout = io::stdout().lock();
  let output: String = match &options.format {
    NoteFormat::Json => formatted.concat(),
    _ => formatted.join(&options.delimiter)
  };
  write!(stdout, "{}", output)?;

  if command.delimiter0 && !notes.is_empty() {
    write!(stdout, "\0")?;
  }
  else if !notes.is_empty() {
    writeln!(stdout)?;
  }
  stdout.flush()?;

  if !options.quiet {
    eprintln!("\nFound {} {}", notes.len(), pluralize("note", notes.len()));
  }

  return Ok(());
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TagJson<'a> {
  name: &'a str,
  note_count: usize
}

pub fn tag_list(context: &CommandContext, command: &TagListCommand) -> ZkResult<()> {
  let notebook: Notebook = context.open_notebook()?;
  let options: TagListOptions = TagListOptions::from(command);
  let index: NoteIndex = refreshed_index(&notebook)?;

  let mut tags: Vec<(String, usize)> = index.tag_counts().into_iter().collect();
  if options.sort == TagSort::NoteCount {
    tags.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
  }

  match options.format {
    TagFormat::Json => {
      let json_tags: Vec<TagJson> = tags
        .iter()
        .map(|(name, note_count)| TagJson { name, note_count: *note_count })
        .collect();
      println!("{}", serde_json::to_string(&json_tags)?);
    },
    TagFormat::Name => tags.iter().for_each(|(name, _)| println!("{}", name)),
    TagFormat::Count => tags.iter().for_each(|(name, count)| println!("{} ({})", name.cyan(), count))
  }

  if !options.quiet {
    eprintln!("\nFound {} {}", tags.len(), pluralize("tag", tags.len()));
  }

  return Ok(());
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GraphLinkJson<'a> {
  title: &'a str,
  href: &'a str,
  #[serde(rename = "type")]
  link_type: LinkType,
  is_external: bool,
  rels: Vec<String>,
  snippet: &'a str,
  source_path: &'a str,
  target_path: &'a str
}

#[derive(Serialize)]
struct GraphJson<'a> {
  notes: Vec<NoteJson<'a>>,
  links: Vec<GraphLinkJson<'a>>
}

/// Notes matching the filters and the links between them, as JSON.
pub fn graph(context: &CommandContext, command: &GraphCommand) -> ZkResult<()> {
  let notebook: Notebook = context.open_notebook()?;
  let (index, find_opts) = find_with(context, &notebook, &command.filter)?;
  let extension: &str = &notebook.config.note.extension;
  let notes: Vec<MatchedNote> = find_notes(&index, &find_opts, extension)?;
  let formatter: NoteFormatter = NoteFormatter::new(NoteFormat::Json, &notebook, &context.working_dir)?;

  let mut links: Vec<GraphLinkJson> = Vec::new();
  for matched in &notes {
    for link in matched.note.links.iter().filter(|link| !link.is_external) {
      let target = match index.resolve_href(&link.href, extension) {
        Some(target) => target,
        None => continue
      };

      if !notes.iter().any(|other| other.note.path == target.path) {
        continue;
      }

      links.push(GraphLinkJson {
        title: &link.title,
        href: &link.href,
        link_type: link.link_type,
        is_external: link.is_external,
        rels: link.rels.iter().map(|rel| rel.to_string()).collect(),
        snippet: &link.snippet,
        source_path: &matched.note.path,
        target_path: &target.path
      });
    }
  }

  let graph_json = GraphJson {
    notes: notes.iter().map(|matched| formatter.json_of(matched)).collect::<Result<Vec<NoteJson>, TemplateError>>()?,
    links
  };

  println!("{}", serde_json::to_string(&graph_json)?);
  return Ok(());
}

fn piped_stdin_content() -> ZkResult<String> {
  let mut content: String = String::new();

  if !io::stdin().is_terminal() {
    io::stdin().read_to_string(&mut content)?;
  }

  return Ok(content);
}

pub fn new(context: &CommandContext, command: &NewCommand) -> ZkResult<()> {
  let notebook: Notebook = context.open_notebook()?;
  let directory: String = notebook.relative_path_of(Path::new(&command.directory), &context.working_dir)?;

  let opts = NewNoteOpts {
    directory,
    group: command.group.clone(),
    title: command.title.clone(),
    content: piped_stdin_content()?,
    extra: parse_extra_values(&command.extra)?,
    date: Utc::now(),
    dry_run: command.dry_run
  };

  let created: NewNote = new_note(&notebook, &opts)?;

  if command.dry_run {
    print!("{}", created.content);
    eprintln!("{}", created.absolute_path.to_string_lossy());
    return Ok(());
  }

  if command.print_path {
    println!("{}", created.absolute_path.to_string_lossy());
    return Ok(());
  }

  if editor_of(&notebook.config).is_none() {
    logger::warn("No editor set, the note was created without opening it");
    println!("{}", created.absolute_path.to_string_lossy());
    return Ok(());
  }

  return open_in_editor(&notebook.config, &notebook.root, &[created.absolute_path]);
}

pub fn edit(context: &CommandContext, command: &EditCommand) -> ZkResult<()> {
  let notebook: Notebook = context.open_notebook()?;
  let (index, find_opts) = find_with(context, &notebook, &command.filter)?;
  let notes: Vec<MatchedNote> = find_notes(&index, &find_opts, &notebook.config.note.extension)?;

  if notes.is_empty() {
    eprintln!("Found 0 notes");
    return Ok(());
  }

  if notes.len() > EDIT_CONFIRMATION_THRESHOLD && !command.force {
    let confirmed: bool = prompt_until_boolean(
      &format!("Are you sure you want to open {} notes in the editor?", notes.len()),
      false
    )?;

    if !confirmed {
      logger::warn(format!("Not opening {} notes, use --force to skip the confirmation", notes.len()));
      return Ok(());
    }
  }

  let files: Vec<PathBuf> = notes
    .iter()
    .map(|matched| matched.note.absolute_path(&notebook.root))
    .collect();

  return open_in_editor(&notebook.config, &notebook.root, &files);
}
