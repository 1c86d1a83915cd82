use super::InitConfigOptions;

pub const DEFAULT_NOTE_TEMPLATE_NAME: &str = "default.md";
pub const DEFAULT_NOTE_TEMPLATE_CONTENTS: &str = "# {{title}}\n\n{{content}}\n";

const NOTE_SECTION: &str =
"# zk configuration file
#
# Uncomment the properties you want to customize.

# NOTE SETTINGS
#
# Defines the default options used when generating new notes.
[note]

# Language used when writing notes.
# This is used to generate slugs or with date formats.
#language = \"en\"

# The default title used for new note, if no `--title` flag is provided.
#default-title = \"Untitled\"

# Template used to generate a note's filename, without extension.
#filename = \"{{id}}\"

# The file extension used for the notes.
#extension = \"md\"

# Template used to generate a note's content.
# If not an absolute path or \"~/unix/path\", it's relative to .zk/templates/
template = \"default.md\"

# Path globs excluded while indexing existing notes.
#exclude = [
#    \"drafts/*\",
#    \"log.md\"
#]

# Configure random ID generation.

# The charset used for random IDs. You can use:
#   * letters: only letters from a to z.
#   * numbers: 0 to 9
#   * alphanum: letters + numbers
#   * hex: hexadecimal, from a to f and 0 to 9
#   * custom string: will use any character from the provided value
#id-charset = \"alphanum\"

# Length of the generated IDs.
#id-length = 4

# Letter case for the random IDs, among lower, upper or mixed.
#id-case = \"lower\"


# EXTRA VARIABLES
#
# A dictionary of variables you can use for any custom values when generating
# new notes. They are accessible in templates with {{extra.<key>}}
[extra]

#key = \"value\"


# GROUP OVERRIDES
#
# You can override global settings from [note] and [extra] for a particular
# group of notes by declaring a [group.\"<name>\"] section.
#
# Specify the list of directories which will automatically belong to the group
# with the optional `paths` property.
#
# Omitting `paths` is equivalent to providing a single path equal to the name of
# the group. This can be useful to quickly declare a group by the name of the
# directory it applies to.

#[group.\"<NAME>\"]
#paths = [\"<DIR1>\", \"<DIR2>\"]
#[group.\"<NAME>\".note]
#filename = \"{{format-date now}}\"
#[group.\"<NAME>\".extra]
#key = \"value\"
";

const TOOL_SECTION: &str =
"

# EXTERNAL TOOLS
[tool]

# Default editor used to open notes. When not set, the ZK_EDITOR, VISUAL or
# EDITOR environment variables are used.
#editor = \"vim\"

# Shell used to run command aliases. Defaults to $SHELL, then sh.
#shell = \"/bin/bash\"


# NAMED FILTERS
#
#    A named filter is a set of list options, usable in place of a path.
#    `zk list recents --limit 15` expands to the flags of the `recents` filter.
[filter]

#recents = \"--sort created- --created-after yesterday\"


# COMMAND ALIASES
#
#   Aliases are user commands run with the shell, extra arguments in $@.
[alias]

#ls = \"zk list $@\"
#ed = \"zk edit $@\"
";

fn toggle_line(key: &str, enabled: bool) -> String {
  return format!("{} = {}\n", key, enabled);
}

/// The commented `.zk/config.toml` written when a notebook is created.
pub fn default_config_toml(init_options: &InitConfigOptions) -> String {
  let mut contents: String = String::from(NOTE_SECTION);

  contents.push_str(
    "\n\n# MARKDOWN SETTINGS\n[format.markdown]\n\n\
    # Format used to generate links between notes.\n\
    # Either \"wiki\", \"markdown\" or a custom template. Default is \"markdown\".\n"
  );

  if init_options.wiki_links {
    contents.push_str("link-format = \"wiki\"\n");
  }
  else {
    contents.push_str("#link-format = \"wiki\"\n");
  }

  contents.push_str(
    "# Indicates whether a link's path will be percent-encoded.\n\
    # Defaults to true for \"markdown\" format and false for \"wiki\" format.\n\
    #link-encode-path = true\n\
    # Indicates whether a link's path file extension will be removed.\n\
    # Defaults to true.\n\
    #link-drop-extension = true\n\n"
  );

  contents.push_str("# Enable support for #hashtags.\n");
  contents.push_str(&toggle_line("hashtags", init_options.hashtags));
  contents.push_str("# Enable support for :colon:separated:tags:.\n");
  contents.push_str(&toggle_line("colon-tags", init_options.colon_tags));
  contents.push_str("# Enable support for Bear's #multi-word tags#\n# Hashtags must be enabled for multi-word tags to work.\n");
  contents.push_str(&toggle_line("multiword-tags", init_options.multiword_tags));

  contents.push_str(TOOL_SECTION);
  return contents;
}
