use std::collections::BTreeMap;
use serde::{Serialize, Deserialize};

// Unknown tables and keys (lsp, fzf options...) are accepted and ignored, so configs
// written for other zk front ends still load.

#[derive(Serialize, Deserialize, Debug, Default)]
#[serde(default)]
pub struct RawConfig {
  pub notebook: RawNotebookConfig,
  pub note: RawNoteConfig,
  #[serde(rename = "group")]
  pub groups: BTreeMap<String, RawGroupConfig>,
  pub format: RawFormatConfig,
  pub tool: RawToolConfig,
  pub extra: Option<BTreeMap<String, String>>,
  #[serde(rename = "filter")]
  pub filters: Option<BTreeMap<String, String>>,
  #[serde(rename = "alias")]
  pub aliases: Option<BTreeMap<String, String>>
}

#[derive(Serialize, Deserialize, Debug, Default)]
#[serde(default)]
pub struct RawNotebookConfig {
  pub dir: Option<String>
}

#[derive(Serialize, Deserialize, Debug, Default, Clone)]
#[serde(default, rename_all = "kebab-case")]
pub struct RawNoteConfig {
  pub filename: Option<String>,
  pub extension: Option<String>,
  pub template: Option<String>,
  #[serde(rename = "language")]
  pub lang: Option<String>,
  pub default_title: Option<String>,
  pub id_charset: Option<String>,
  pub id_length: Option<usize>,
  pub id_case: Option<String>,
  pub exclude: Vec<String>,
  // Legacy name of `exclude`.
  pub ignore: Vec<String>
}

#[derive(Serialize, Deserialize, Debug, Default)]
#[serde(default)]
pub struct RawGroupConfig {
  pub paths: Option<Vec<String>>,
  pub note: RawNoteConfig,
  pub extra: Option<BTreeMap<String, String>>
}

#[derive(Serialize, Deserialize, Debug, Default)]
#[serde(default)]
pub struct RawFormatConfig {
  pub markdown: RawMarkdownConfig
}

#[derive(Serialize, Deserialize, Debug, Default)]
#[serde(default, rename_all = "kebab-case")]
pub struct RawMarkdownConfig {
  pub hashtags: Option<bool>,
  pub colon_tags: Option<bool>,
  pub multiword_tags: Option<bool>,
  pub link_format: Option<String>,
  pub link_encode_path: Option<bool>,
  pub link_drop_extension: Option<bool>
}

#[derive(Serialize, Deserialize, Debug, Default)]
#[serde(default)]
pub struct RawToolConfig {
  pub editor: Option<String>,
  pub shell: Option<String>
}
