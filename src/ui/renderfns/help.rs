use crate::commands::Command;

use super::table::Table;

/// Command reference for the shell
pub fn help(commands: &[Command]) -> String {
  let mut table = Table::new(vec!["Command", "Aliases", "Description"]).with_max_width(60);
  for cmd in commands {
    table.row(vec![
      cmd.name.to_string(),
      cmd.aliases.join(", "),
      cmd.description.to_string(),
    ]);
  }

  let mut out = table.render();
  out.push_str("\nUsage:\n");
  for cmd in commands {
    out.push_str(&format!("  {}\n", cmd.usage));
  }
  out
}
