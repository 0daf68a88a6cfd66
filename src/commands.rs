/// Available shell commands and autocomplete logic

#[derive(Debug, Clone)]
pub struct Command {
  pub name: &'static str,
  pub aliases: &'static [&'static str],
  pub usage: &'static str,
  pub description: &'static str,
}

/// All available commands
pub const COMMANDS: &[Command] = &[
  Command {
    name: "list",
    aliases: &["ls", "books"],
    usage: "list [--genre G] [--sort-by F] [--sort asc|desc] [--limit N]",
    description: "List books",
  },
  Command {
    name: "latest",
    aliases: &["recent", "new"],
    usage: "latest",
    description: "Show the six most recently added books",
  },
  Command {
    name: "show",
    aliases: &["get", "view"],
    usage: "show <id>",
    description: "Show every field of one book",
  },
  Command {
    name: "add",
    aliases: &["create"],
    usage: "add --title T --author A --genre G --isbn I --copies N [--description D]",
    description: "Add a book",
  },
  Command {
    name: "edit",
    aliases: &["update"],
    usage: "edit <id> [--title T] [--author A] [--genre G] [--isbn I] [--copies N] [--description D]",
    description: "Change some fields of a book",
  },
  Command {
    name: "delete",
    aliases: &["rm", "del"],
    usage: "delete <id> [--yes]",
    description: "Delete a book",
  },
  Command {
    name: "borrow",
    aliases: &["b", "lend"],
    usage: "borrow <id> [--quantity N] [--due YYYY-MM-DD]",
    description: "Borrow copies of a book",
  },
  Command {
    name: "summary",
    aliases: &["borrowed", "report"],
    usage: "summary",
    description: "Total borrowed quantity per book",
  },
  Command {
    name: "open",
    aliases: &["o", "mount"],
    usage: "open books [list options] | latest | summary | book <id>",
    description: "Keep a view on screen, refreshed after every change",
  },
  Command {
    name: "close",
    aliases: &["c", "unmount"],
    usage: "close",
    description: "Close all open views",
  },
  Command {
    name: "help",
    aliases: &["h", "?"],
    usage: "help",
    description: "Show this help",
  },
  Command {
    name: "quit",
    aliases: &["q", "exit"],
    usage: "quit",
    description: "Exit the shell",
  },
];

/// Find a command by exact name or alias
pub fn resolve(input: &str) -> Option<&'static Command> {
  let input_lower = input.to_lowercase();
  COMMANDS
    .iter()
    .find(|cmd| cmd.name == input_lower || cmd.aliases.contains(&input_lower.as_str()))
}

/// Get autocomplete suggestions for a given input
pub fn get_suggestions(input: &str) -> Vec<&'static Command> {
  let input_lower = input.to_lowercase();

  if input_lower.is_empty() {
    return COMMANDS.iter().collect();
  }

  let mut matches: Vec<(&Command, u32)> = Vec::new();

  for cmd in COMMANDS {
    // Exact match on name
    if cmd.name == input_lower {
      matches.push((cmd, 0)); // Highest priority
      continue;
    }

    // Exact match on alias
    if cmd.aliases.contains(&input_lower.as_str()) {
      matches.push((cmd, 1));
      continue;
    }

    // Prefix match on name
    if cmd.name.starts_with(&input_lower) {
      matches.push((cmd, 2));
      continue;
    }

    // Prefix match on alias
    if cmd.aliases.iter().any(|a| a.starts_with(&input_lower)) {
      matches.push((cmd, 3));
      continue;
    }

    // Fuzzy match (contains)
    if cmd.name.contains(&input_lower) {
      matches.push((cmd, 4));
      continue;
    }

    // Fuzzy match on alias
    if cmd.aliases.iter().any(|a| a.contains(&input_lower)) {
      matches.push((cmd, 5));
    }
  }

  // Sort by priority
  matches.sort_by_key(|(_, priority)| *priority);

  matches.into_iter().map(|(cmd, _)| cmd).collect()
}

/// Split a shell line into words, the way a POSIX shell would. Quotes group
/// words and are removed; a backslash escapes the next character.
pub fn split_args(line: &str) -> Result<Vec<String>, String> {
  shell_words::split(line).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_empty_input_returns_all() {
    let suggestions = get_suggestions("");
    assert_eq!(suggestions.len(), COMMANDS.len());
  }

  #[test]
  fn test_exact_match() {
    let suggestions = get_suggestions("borrow");
    assert!(!suggestions.is_empty());
    assert_eq!(suggestions[0].name, "borrow");
  }

  #[test]
  fn test_alias_match() {
    let suggestions = get_suggestions("ls");
    assert!(!suggestions.is_empty());
    assert_eq!(suggestions[0].name, "list");
  }

  #[test]
  fn test_prefix_match() {
    let suggestions = get_suggestions("sum");
    assert!(!suggestions.is_empty());
    assert_eq!(suggestions[0].name, "summary");
  }

  #[test]
  fn test_fuzzy_match() {
    let suggestions = get_suggestions("orro");
    assert!(!suggestions.is_empty());
    assert_eq!(suggestions[0].name, "borrow");
  }

  #[test]
  fn test_no_match() {
    assert!(get_suggestions("zzz").is_empty());
  }

  #[test]
  fn test_resolve_names_and_aliases() {
    assert_eq!(resolve("rm").map(|c| c.name), Some("delete"));
    assert_eq!(resolve("LIST").map(|c| c.name), Some("list"));
    assert_eq!(resolve("?").map(|c| c.name), Some("help"));
    assert!(resolve("li").is_none());
  }

  #[test]
  fn test_aliases_are_unique() {
    let mut seen = std::collections::HashSet::new();
    for cmd in COMMANDS {
      assert!(seen.insert(cmd.name), "duplicate {}", cmd.name);
      for alias in cmd.aliases {
        assert!(seen.insert(*alias), "duplicate {}", alias);
      }
    }
  }

  #[test]
  fn test_split_args() {
    assert_eq!(
      split_args(r#"add --title "The Left Hand of Darkness" --copies 2"#).unwrap(),
      vec!["add", "--title", "The Left Hand of Darkness", "--copies", "2"]
    );
    assert_eq!(
      split_args("edit b1 --description ''").unwrap(),
      vec!["edit", "b1", "--description", ""]
    );
    assert_eq!(split_args(r"show it\'s").unwrap(), vec!["show", "it's"]);
    assert!(split_args("  ").unwrap().is_empty());
  }

  #[test]
  fn test_split_args_errors() {
    assert!(split_args("add --title \"open").is_err());
    assert!(split_args("show 'book-1").is_err());
  }
}
