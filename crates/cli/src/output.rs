// SPDX-License-Identifier: MIT

//! Text/JSON output helpers shared across `swarmctl` subcommands.

use clap::ValueEnum;
use serde::Serialize;

#[derive(Clone, Copy, Debug, Default, PartialEq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Render a list as a text table or as JSON. Handles the empty-list message
/// and the format branch shared by every `list`-shaped subcommand.
pub fn handle_list<T: Serialize>(
    format: OutputFormat,
    items: &[T],
    empty_msg: &str,
    render_text: impl FnOnce(&[T]),
) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(items)?),
        OutputFormat::Text => {
            if items.is_empty() {
                println!("{}", empty_msg);
            } else {
                render_text(items);
            }
        }
    }
    Ok(())
}

/// Format-branch helper for non-list commands (status, control, ...).
pub fn format_or_json<T: Serialize>(
    format: OutputFormat,
    data: &T,
    text_fn: impl FnOnce(),
) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(data)?),
        OutputFormat::Text => text_fn(),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[derive(Serialize)]
    struct Item {
        name: String,
    }

    #[test]
    fn handle_list_prints_empty_message_for_empty_slice() {
        let items: Vec<Item> = Vec::new();
        let called = Cell::new(false);
        handle_list(OutputFormat::Text, &items, "nothing here", |_| called.set(true)).unwrap();
        assert!(!called.get(), "render_text must not run on an empty list");
    }

    #[test]
    fn handle_list_renders_text_for_nonempty_slice() {
        let items = vec![Item { name: "a".into() }];
        let called = Cell::new(false);
        handle_list(OutputFormat::Text, &items, "nothing here", |rendered| {
            assert_eq!(rendered.len(), 1);
            called.set(true);
        })
        .unwrap();
        assert!(called.get(), "render_text must run on a nonempty list");
    }

    #[test]
    fn handle_list_json_never_calls_render_text() {
        let items = vec![Item { name: "a".into() }];
        let called = Cell::new(false);
        handle_list(OutputFormat::Json, &items, "nothing here", |_| called.set(true)).unwrap();
        assert!(!called.get(), "json branch must not invoke the text renderer");
    }

    #[test]
    fn format_or_json_calls_text_fn_in_text_mode() {
        let data = Item { name: "a".into() };
        let called = Cell::new(false);
        format_or_json(OutputFormat::Text, &data, || called.set(true)).unwrap();
        assert!(called.get());
    }

    #[test]
    fn format_or_json_skips_text_fn_in_json_mode() {
        let data = Item { name: "a".into() };
        let called = Cell::new(false);
        format_or_json(OutputFormat::Json, &data, || called.set(true)).unwrap();
        assert!(!called.get());
    }
}
