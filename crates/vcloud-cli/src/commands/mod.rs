// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! CLI command implementations.

pub mod dot;
pub mod layout;
pub mod ranges;
pub mod translate;

use vcloud_layout::LayoutOptions;

/// Positional arguments and flags shared by the commands. Only arguments
/// starting with `--` are flags, so negative offsets stay positional.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct CommandArgs {
    pub positional: Vec<String>,
    pub interleave: bool,
    pub word_width: Option<u64>,
    pub json: bool,
    pub precise: bool,
    pub absolute: bool,
}

impl CommandArgs {
    pub fn parse(args: &[String]) -> Result<Self, String> {
        let mut parsed = Self::default();
        let mut iter = args.iter();
        while let Some(arg) = iter.next() {
            match arg.as_str() {
                "--interleave" => parsed.interleave = true,
                "--json" => parsed.json = true,
                "--precise" => parsed.precise = true,
                "--absolute" => parsed.absolute = true,
                "--word-width" => {
                    let value = iter.next().ok_or("`--word-width` needs a value")?;
                    parsed.word_width = Some(parse_word_width(value)?);
                }
                flag if flag.starts_with("--word-width=") => {
                    parsed.word_width = Some(parse_word_width(&flag["--word-width=".len()..])?);
                }
                flag if flag.starts_with("--") => return Err(format!("unknown flag `{}`", flag)),
                _ => parsed.positional.push(arg.clone()),
            }
        }
        Ok(parsed)
    }

    pub fn layout_options(&self) -> LayoutOptions {
        let options = if self.interleave {
            LayoutOptions::interleaved()
        } else {
            LayoutOptions::ordered()
        };
        options.with_word_width(self.word_width.unwrap_or(LayoutOptions::DEFAULT_WORD_WIDTH))
    }

    /// The positional argument at `index`, named `name` in the error.
    pub fn positional(&self, index: usize, name: &str) -> Result<&str, String> {
        self.positional
            .get(index)
            .map(String::as_str)
            .ok_or_else(|| format!("missing {}", name))
    }

    /// Fail if more than `count` positional arguments were given.
    pub fn expect_positionals(&self, count: usize) -> Result<(), String> {
        match self.positional.get(count) {
            Some(extra) => Err(format!("unexpected argument `{}`", extra)),
            None => Ok(()),
        }
    }
}

fn parse_word_width(value: &str) -> Result<u64, String> {
    match value.parse::<u64>() {
        Ok(0) => Err("`--word-width` must be positive".to_string()),
        Ok(width) => Ok(width),
        Err(_) => Err(format!("`--word-width` expects a number, got `{}`", value)),
    }
}
