use std::path::Path;

use serde::Serialize;

use crate::{
  notebook_config::MarkdownConfig,
  templates::{render_template, TemplateError}
};

fn is_unescaped_path_byte(byte: u8) -> bool {
  return byte.is_ascii_alphanumeric()
    || matches!(byte, b'-' | b'_' | b'.' | b'~' | b'$' | b'&' | b'+' | b':' | b'=' | b'@' | b'/');
}

/// Percent-encodes a relative path, keeping its `/` separators.
pub fn percent_encode_path(path: &str) -> String {
  let mut encoded: String = String::with_capacity(path.len());

  for byte in path.bytes() {
    if is_unescaped_path_byte(byte) {
      encoded.push(byte as char);
    }
    else {
      encoded.push_str(&format!("%{:02X}", byte));
    }
  }

  return encoded;
}

/// Decodes %XX sequences. Returns None when a sequence is malformed or the result is not UTF-8.
pub fn percent_decode(encoded: &str) -> Option<String> {
  let bytes: &[u8] = encoded.as_bytes();
  let mut decoded: Vec<u8> = Vec::with_capacity(bytes.len());
  let mut index: usize = 0;

  while index < bytes.len() {
    if bytes[index] == b'%' {
      let hex: &str = encoded.get(index + 1..index + 3)?;
      decoded.push(u8::from_str_radix(hex, 16).ok()?);
      index += 3;
    }
    else {
      decoded.push(bytes[index]);
      index += 1;
    }
  }

  return String::from_utf8(decoded).ok();
}

pub fn drop_extension(path: &str) -> String {
  let as_path: &Path = Path::new(path);

  return match as_path.extension() {
    Some(extension) => path[..path.len() - extension.len() - 1].to_owned(),
    None => path.to_owned()
  }
}

fn format_path(path: &str, markdown_config: &MarkdownConfig) -> String {
  let mut formatted: String = path.to_owned();

  if markdown_config.link_drop_extension {
    formatted = drop_extension(&formatted);
  }

  if markdown_config.link_encode_path {
    formatted = percent_encode_path(&formatted);
  }

  return formatted;
}

/// What a link to a note can refer to.
pub struct LinkTarget<'a> {
  pub path: &'a str,
  pub rel_path: &'a str,
  pub abs_path: &'a str,
  pub title: &'a str
}

#[derive(Serialize)]
#[serde(rename_all = "kebab-case")]
struct LinkTemplateContext<'a> {
  path: String,
  rel_path: String,
  abs_path: String,
  filename: String,
  title: &'a str
}

/*
  Formats a link to the target with the configured link format: "markdown",
  "wiki", or any other value used as a {{path}}/{{title}} template.
*/
pub fn format_link(target: &LinkTarget, markdown_config: &MarkdownConfig) -> Result<String, TemplateError> {
  match markdown_config.link_format.as_str() {
    "markdown" | "" => {
      let mut path: String = format_path(target.rel_path, markdown_config);
      if !markdown_config.link_encode_path {
        path = path.replace('\\', "\\\\").replace(')', "\\)");
      }

      let title: String = target.title.replace('\\', "\\\\").replace(']', "\\]");
      return Ok(format!("[{}]({})", title, path));
    },
    "wiki" => {
      let mut path: String = format_path(target.path, markdown_config);
      if !markdown_config.link_encode_path {
        path = path.replace('\\', "\\\\").replace("]]", "\\]]");
      }

      return Ok(format!("[[{}]]", path));
    },
    template => {
      let filename: &str = Path::new(target.path)
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or(target.path);

      let context = LinkTemplateContext {
        path: format_path(target.path, markdown_config),
        rel_path: format_path(target.rel_path, markdown_config),
        abs_path: format_path(target.abs_path, markdown_config),
        filename: format_path(filename, markdown_config),
        title: target.title
      };

      return render_template(template, &context);
    }
  }
}
