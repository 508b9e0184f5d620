//! Named validation functions callable from KEYWORD test cases.
//!
//! A KEYWORD case's code column holds a call like `check_row_count(people)`.
//! The call is parsed into a function name plus literal string arguments and
//! dispatched through a [`Registry`]. Every function returns the string that
//! gets compared against the expected result.

use std::collections::HashMap;

use thiserror::Error;

use crate::store::{SqlStore, quote_ident};

/// Signature shared by all registered validation functions. Functions that
/// do not need the store simply ignore it.
pub type KeywordFn = fn(&SqlStore, &[String]) -> Result<String, FunctionError>;

#[derive(Error, Debug)]
pub enum FunctionError {
    #[error("Function '{0}' not found in the validation function registry")]
    UnknownFunction(String),

    #[error("Malformed function call '{call}': {reason}")]
    BadCall { call: String, reason: String },

    #[error("{function}() expects {expected} argument(s), got {got}")]
    BadArity {
        function: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("{function}() could not parse '{value}' as an integer")]
    BadIntegerArgument {
        function: &'static str,
        value: String,
    },

    #[error(transparent)]
    Store(#[from] crate::store::StoreError),
}

/// Split a keyword call into its function name and literal arguments.
///
/// `name(a, b)` yields the name plus its arguments; a bare `name` yields no
/// arguments. Arguments are comma-separated; single or double quotes group
/// an argument and may contain commas. Code that has a `(` but no trailing
/// `)` is treated as a bare function name, which then fails the registry
/// lookup with its full text in the message.
pub fn parse_call(code: &str) -> Result<(String, Vec<String>), FunctionError> {
    let code = code.trim();
    let open = match code.find('(') {
        Some(idx) if code.ends_with(')') => idx,
        _ => return Ok((code.to_string(), Vec::new())),
    };
    let name = code[..open].trim().to_string();
    let body = &code[open + 1..code.len() - 1];
    let args = split_arguments(body).map_err(|reason| FunctionError::BadCall {
        call: code.to_string(),
        reason,
    })?;
    Ok((name, args))
}

enum ArgState {
    Start,
    Bare,
    Quoted(char),
    AfterQuote,
}

fn split_arguments(body: &str) -> Result<Vec<String>, String> {
    if body.trim().is_empty() {
        return Ok(Vec::new());
    }

    let mut args = Vec::new();
    let mut current = String::new();
    let mut state = ArgState::Start;

    for c in body.chars() {
        state = match state {
            ArgState::Start => match c {
                c if c.is_whitespace() => ArgState::Start,
                '\'' | '"' => ArgState::Quoted(c),
                ',' => {
                    args.push(String::new());
                    ArgState::Start
                }
                _ => {
                    current.push(c);
                    ArgState::Bare
                }
            },
            ArgState::Bare => match c {
                ',' => {
                    args.push(current.trim_end().to_string());
                    current.clear();
                    ArgState::Start
                }
                _ => {
                    current.push(c);
                    ArgState::Bare
                }
            },
            ArgState::Quoted(quote) => {
                if c == quote {
                    ArgState::AfterQuote
                } else {
                    current.push(c);
                    ArgState::Quoted(quote)
                }
            }
            ArgState::AfterQuote => match c {
                c if c.is_whitespace() => ArgState::AfterQuote,
                ',' => {
                    args.push(current.clone());
                    current.clear();
                    ArgState::Start
                }
                _ => return Err(format!("unexpected '{}' after closing quote", c)),
            },
        };
    }

    match state {
        ArgState::Quoted(_) => Err("unterminated quoted argument".to_string()),
        ArgState::Bare => {
            args.push(current.trim_end().to_string());
            Ok(args)
        }
        ArgState::AfterQuote => {
            args.push(current);
            Ok(args)
        }
        // A trailing comma, like a one-element tuple, adds nothing
        ArgState::Start => Ok(args),
    }
}

/// Registry of callable validation functions, looked up by name.
pub struct Registry {
    functions: HashMap<String, KeywordFn>,
}

impl Registry {
    /// The shipped registry with the built-in functions registered.
    pub fn builtin() -> Self {
        let mut registry = Registry {
            functions: HashMap::new(),
        };
        registry.register("check_row_count", check_row_count);
        registry.register("always_pass", always_pass);
        registry.register("custom_logic_example", custom_logic_example);
        registry
    }

    pub fn register(&mut self, name: &str, function: KeywordFn) {
        self.functions.insert(name.to_string(), function);
    }

    /// Registered function names, alphabetically.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.functions.keys().cloned().collect();
        names.sort();
        names
    }

    /// Look up and invoke a function.
    pub fn call(
        &self,
        store: &SqlStore,
        name: &str,
        args: &[String],
    ) -> Result<String, FunctionError> {
        let function = self
            .functions
            .get(name)
            .ok_or_else(|| FunctionError::UnknownFunction(name.to_string()))?;
        function(store, args)
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Row count of the named table, as a string.
fn check_row_count(store: &SqlStore, args: &[String]) -> Result<String, FunctionError> {
    let [table] = args else {
        return Err(FunctionError::BadArity {
            function: "check_row_count",
            expected: 1,
            got: args.len(),
        });
    };
    let output = store.query(&format!("SELECT COUNT(*) FROM {}", quote_ident(table)))?;
    // COUNT(*) always yields exactly one 1x1 row
    Ok(output.scalar().map(|v| v.to_string()).unwrap_or_default())
}

/// Always returns `PASS`. Useful as a wiring smoke test.
fn always_pass(_store: &SqlStore, args: &[String]) -> Result<String, FunctionError> {
    if !args.is_empty() {
        return Err(FunctionError::BadArity {
            function: "always_pass",
            expected: 0,
            got: args.len(),
        });
    }
    Ok("PASS".to_string())
}

/// Adds two integer arguments and returns the sum as a string.
fn custom_logic_example(_store: &SqlStore, args: &[String]) -> Result<String, FunctionError> {
    let [a, b] = args else {
        return Err(FunctionError::BadArity {
            function: "custom_logic_example",
            expected: 2,
            got: args.len(),
        });
    };
    let a = parse_integer_argument("custom_logic_example", a)?;
    let b = parse_integer_argument("custom_logic_example", b)?;
    Ok((a + b).to_string())
}

fn parse_integer_argument(function: &'static str, value: &str) -> Result<i64, FunctionError> {
    value
        .trim()
        .parse::<i64>()
        .map_err(|_| FunctionError::BadIntegerArgument {
            function,
            value: value.to_string(),
        })
}
