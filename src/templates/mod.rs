//! Handlebars rendering for note filenames, note bodies, list formats and custom links.

use chrono::{DateTime, Utc};
use colored::{ColoredString, Colorize};
use handlebars::{
  no_escape,
  Context,
  Handlebars,
  Helper,
  HelperResult,
  JsonRender,
  Output,
  RenderContext,
  RenderError,
  RenderErrorReason
};
use serde::Serialize;
use serde_json::Value as JsonValue;
use thiserror::Error;

use crate::{
  common::{elapsed_since, slugify},
  logger,
  notebook::note_find::parse_date_filter
};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TemplateError {
  #[error("Invalid template \"{template}\": {reason}")]
  Invalid {
    template: String,
    reason: String
  },

  #[error("Failed to render template: {0}")]
  Render(String)
}

lazy_static! {
  static ref SHARED_RENDERER: TemplateRenderer = TemplateRenderer::new();
}

/// Renders a one-off template with the shared helper set.
pub fn render_template<T: Serialize>(template: &str, context: &T) -> Result<String, TemplateError> {
  return SHARED_RENDERER.render_str(template, context);
}

/*
  A Handlebars registry with the zk helpers. Output is never HTML-escaped and unknown
  variables render as an empty string.
*/
pub struct TemplateRenderer {
  registry: Handlebars<'static>
}

impl TemplateRenderer {
  pub fn new() -> Self {
    let mut registry: Handlebars<'static> = Handlebars::new();
    registry.register_escape_fn(no_escape);

    registry.register_helper("concat", Box::new(concat_helper));
    registry.register_helper("date", Box::new(date_helper));
    registry.register_helper("format-date", Box::new(format_date_helper));
    registry.register_helper("join", Box::new(join_helper));
    registry.register_helper("json", Box::new(json_helper));
    registry.register_helper("list", Box::new(list_helper));
    registry.register_helper("prepend", Box::new(prepend_helper));
    registry.register_helper("slug", Box::new(slug_helper));
    registry.register_helper("style", Box::new(style_helper));

    return TemplateRenderer { registry };
  }

  /// Compiles a template once, to render it many times under `name`.
  pub fn register(&mut self, name: &str, template: &str) -> Result<(), TemplateError> {
    return self.registry
      .register_template_string(name, template)
      .map_err(|template_err| TemplateError::Invalid {
        template: template.to_owned(),
        reason: template_err.to_string()
      });
  }

  pub fn render<T: Serialize>(&self, name: &str, context: &T) -> Result<String, TemplateError> {
    return self.registry
      .render(name, context)
      .map_err(|render_err| TemplateError::Render(render_err.to_string()));
  }

  pub fn render_str<T: Serialize>(&self, template: &str, context: &T) -> Result<String, TemplateError> {
    return self.registry
      .render_template(template, context)
      .map_err(|render_err| TemplateError::Invalid {
        template: template.to_owned(),
        reason: render_err.to_string()
      });
  }
}

fn helper_error(message: String) -> RenderError {
  return RenderErrorReason::Other(message).into();
}

fn param_value<'h>(helper: &'h Helper, index: usize) -> Option<&'h JsonValue> {
  return helper.param(index).map(|param| param.value());
}

// Missing parameters render as an empty string, like a missing variable.
fn text_param(helper: &Helper, index: usize) -> String {
  return match param_value(helper, index) {
    Some(JsonValue::Null) | None => String::new(),
    Some(value) => value.render()
  }
}

fn string_list_param(helper: &Helper, index: usize) -> Vec<String> {
  return match param_value(helper, index) {
    Some(JsonValue::Array(items)) => items.iter().map(|item| item.render()).collect(),
    Some(JsonValue::Null) | None => Vec::new(),
    Some(single) => vec![single.render()]
  }
}

/// Named date formats, or a strftime format.
fn date_format_of(name: &str) -> &str {
  return match name {
    "short" => "%m/%d/%Y",
    "medium" => "%b %d, %Y",
    "long" => "%B %d, %Y",
    "full" => "%A, %B %d, %Y",
    "year" => "%Y",
    "time" => "%H:%M",
    "timestamp" => "%Y%m%d%H%M",
    "timestamp-unix" => "%s",
    custom => custom
  }
}

fn format_date(date: DateTime<Utc>, format_name: Option<&str>) -> String {
  return match format_name {
    Some("elapsed") => elapsed_since(date, Utc::now()),
    Some(name) => date.format(date_format_of(name)).to_string(),
    None => date.format("%Y-%m-%d").to_string()
  }
}

fn date_param(helper: &Helper, helper_name: &str) -> Result<DateTime<Utc>, RenderError> {
  let text: String = text_param(helper, 0);

  if let Ok(date) = DateTime::parse_from_rfc3339(&text) {
    return Ok(date.with_timezone(&Utc));
  }

  return parse_date_filter(&text, Utc::now())
    .map_err(|_| helper_error(format!("the {{{{{}}}}} helper expects a date, received \"{}\"", helper_name, text)));
}

// {{format-date now "medium"}} -> May 01, 2024
fn format_date_helper(
  helper: &Helper,
  _: &Handlebars,
  _: &Context,
  _: &mut RenderContext,
  out: &mut dyn Output
) -> HelperResult {
  let date: DateTime<Utc> = date_param(helper, "format-date")?;
  let format_name: Option<String> = param_value(helper, 1).map(|value| value.render());

  out.write(&format_date(date, format_name.as_deref()))?;
  return Ok(());
}

/*
  {{date "yesterday"}} gives an RFC 3339 date to feed format-date. Given a date and a
  format, {{date created "elapsed"}} formats it like format-date.
*/
fn date_helper(
  helper: &Helper,
  _: &Handlebars,
  _: &Context,
  _: &mut RenderContext,
  out: &mut dyn Output
) -> HelperResult {
  let date: DateTime<Utc> = date_param(helper, "date")?;

  let rendered: String = match param_value(helper, 1) {
    Some(format_name) => format_date(date, Some(&format_name.render())),
    None => date.to_rfc3339()
  };

  out.write(&rendered)?;
  return Ok(());
}

// {{slug "A Title!"}} -> a-title
fn slug_helper(
  helper: &Helper,
  _: &Handlebars,
  _: &Context,
  _: &mut RenderContext,
  out: &mut dyn Output
) -> HelperResult {
  out.write(&slugify(text_param(helper, 0)))?;
  return Ok(());
}

// {{concat "> " title}}
fn concat_helper(
  helper: &Helper,
  _: &Handlebars,
  _: &Context,
  _: &mut RenderContext,
  out: &mut dyn Output
) -> HelperResult {
  for index in 0..helper.params().len() {
    out.write(&text_param(helper, index))?;
  }
  return Ok(());
}

// {{join tags ", "}}
fn join_helper(
  helper: &Helper,
  _: &Handlebars,
  _: &Context,
  _: &mut RenderContext,
  out: &mut dyn Output
) -> HelperResult {
  let items: Vec<String> = string_list_param(helper, 0);
  out.write(&items.join(&text_param(helper, 1)))?;
  return Ok(());
}

fn json_helper(
  helper: &Helper,
  _: &Handlebars,
  _: &Context,
  _: &mut RenderContext,
  out: &mut dyn Output
) -> HelperResult {
  let value: &JsonValue = param_value(helper, 0).unwrap_or(&JsonValue::Null);
  let serialized: String = serde_json::to_string(value)
    .map_err(|json_err| helper_error(json_err.to_string()))?;

  out.write(&serialized)?;
  return Ok(());
}

fn prepend_lines(text: &str, prefix: &str) -> String {
  return text
    .lines()
    .map(|line| format!("{}{}", prefix, line))
    .collect::<Vec<String>>()
    .join("\n");
}

// {{prepend "> " body}} prefixes every line.
fn prepend_helper(
  helper: &Helper,
  _: &Handlebars,
  _: &Context,
  _: &mut RenderContext,
  out: &mut dyn Output
) -> HelperResult {
  out.write(&prepend_lines(&text_param(helper, 1), &text_param(helper, 0)))?;
  return Ok(());
}

// One "  - item" line per non-empty item. Continuation lines are indented under it.
fn list_helper(
  helper: &Helper,
  _: &Handlebars,
  _: &Context,
  _: &mut RenderContext,
  out: &mut dyn Output
) -> HelperResult {
  for item in string_list_param(helper, 0).iter().filter(|item| !item.trim().is_empty()) {
    let continued: String = item.trim_end().replace('\n', "\n    ");
    out.write(&format!("  - {}\n", continued))?;
  }
  return Ok(());
}

fn apply_style(styled: ColoredString, rule: &str) -> ColoredString {
  return match rule {
    "title" => styled.bold().yellow(),
    "path" => styled.underline().cyan(),
    "term" => styled.red(),
    "emphasis" | "bold" => styled.bold(),
    "understate" | "dim" | "faint" => styled.dimmed(),
    "italic" => styled.italic(),
    "underline" => styled.underline(),
    "strikethrough" => styled.strikethrough(),
    "reverse" => styled.reversed(),
    "black" => styled.black(),
    "red" => styled.red(),
    "green" => styled.green(),
    "yellow" => styled.yellow(),
    "blue" => styled.blue(),
    "magenta" => styled.magenta(),
    "cyan" => styled.cyan(),
    "white" => styled.white(),
    unknown => {
      logger::verbose(format!("Unknown style rule '{}' in template", unknown));
      styled
    }
  }
}

// {{style "title" title}}. Rules are space separated, like "red bold".
fn style_helper(
  helper: &Helper,
  _: &Handlebars,
  _: &Context,
  _: &mut RenderContext,
  out: &mut dyn Output
) -> HelperResult {
  let rules: String = text_param(helper, 0);
  let text: String = text_param(helper, 1);

  let styled: ColoredString = rules
    .split_whitespace()
    .fold(text.normal(), apply_style);

  out.write(&styled.to_string())?;
  return Ok(());
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  fn render(template: &str, context: JsonValue) -> String {
    return render_template(template, &context).unwrap();
  }

  #[test]
  fn variables_and_blocks_render() {
    let context: JsonValue = json!({ "title": "Hello World", "filename-stem": "hello" });

    assert_eq!(render("{{#if title}}# {{title}}{{/if}}", context.clone()), "# Hello World");
    assert_eq!(render("{{filename-stem}}{{missing}}", context.clone()), "hello");
    assert_eq!(render("<{{title}}> & co", context), "<Hello World> & co");
  }

  #[test]
  fn slug_and_concat_helpers() {
    let context: JsonValue = json!({ "title": "Hello World, again!" });

    assert_eq!(render("{{slug title}}", context.clone()), "hello-world-again");
    assert_eq!(render("{{concat \"> \" title}}", context), "> Hello World, again!");
  }

  #[test]
  fn date_helpers_format_rfc3339_and_natural_dates() {
    let context: JsonValue = json!({ "now": "2024-05-01T09:30:00Z" });

    assert_eq!(render("{{format-date now}}", context.clone()), "2024-05-01");
    assert_eq!(render("{{format-date now \"%Y\"}}", context.clone()), "2024");
    assert_eq!(render("{{format-date now \"medium\"}}", context.clone()), "May 01, 2024");
    assert_eq!(render("{{date now \"timestamp\"}}", context), "202405010930");

    let yesterday: String = render("{{format-date (date \"yesterday\") \"timestamp\"}}", json!({}));
    assert!(yesterday.ends_with("0000"));
  }

  #[test]
  fn list_helpers() {
    let context: JsonValue = json!({ "tags": ["a", "b"], "snippets": ["one", "", "two\nlines"], "body": "x\ny" });

    assert_eq!(render("{{join tags \", \"}}", context.clone()), "a, b");
    assert_eq!(render("{{list snippets}}", context.clone()), "  - one\n  - two\n    lines\n");
    assert_eq!(render("{{prepend \"> \" body}}", context.clone()), "> x\n> y");
    assert_eq!(render("{{json tags}}", context), "[\"a\",\"b\"]");
  }

  #[test]
  fn style_is_plain_without_colors() {
    colored::control::set_override(false);
    assert_eq!(render("{{style \"title red\" title}}", json!({ "title": "T" })), "T");
  }

  #[test]
  fn compiled_templates_are_reused() {
    let mut renderer: TemplateRenderer = TemplateRenderer::new();
    renderer.register("line", "{{id}}: {{title}}").unwrap();

    assert_eq!(renderer.render("line", &json!({ "id": 1, "title": "A" })).unwrap(), "1: A");
    assert_eq!(renderer.render("line", &json!({ "id": 2, "title": "B" })).unwrap(), "2: B");
  }

  #[test]
  fn syntax_errors_are_reported() {
    assert!(matches!(render_template("{{#if title}}open", &json!({})), Err(TemplateError::Invalid { .. })));
    assert!(TemplateRenderer::new().register("broken", "{{#each tags}}unclosed").is_err());
  }
}
