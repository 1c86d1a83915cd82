use std::{process::exit, sync::atomic::{AtomicBool, Ordering}};
use colored::Colorize;

static VERBOSE: AtomicBool = AtomicBool::new(false);

pub fn set_verbose(is_verbose: bool) {
  VERBOSE.store(is_verbose, Ordering::Relaxed);
}

pub fn is_verbose() -> bool {
  return VERBOSE.load(Ordering::Relaxed);
}

// Colors are turned off for --no-color and NO_COLOR. Otherwise colored decides on its own.
pub fn configure_colors(no_color_flag: bool) {
  if no_color_flag || std::env::var_os("NO_COLOR").is_some() {
    colored::control::set_override(false);
  }
}

pub fn warn(message: impl AsRef<str>) {
  eprintln!(
    "{}: {}",
    "Warning".yellow(),
    message.as_ref()
  );
}

pub fn error(message: impl AsRef<str>) {
  eprintln!(
    "{}: {}",
    "Error".red(),
    message.as_ref()
  );
}

pub fn verbose(message: impl AsRef<str>) {
  if is_verbose() {
    eprintln!("{}", message.as_ref().dimmed());
  }
}

pub fn exit_error_log(error_message: impl AsRef<str>) -> ! {
  error(error_message);
  exit(1);
}
