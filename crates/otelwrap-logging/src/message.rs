//! Message interpolation.
//!
//! Templates use `{}` placeholders, with `{{` and `}}` for literal braces.
//! A template with no arguments is used verbatim.

use crate::error::InterpolationError;
use otelwrap_core::Value;
use std::fmt::Write as _;

/// Fill the placeholders of `template` with the string forms of `args`.
pub fn interpolate(template: &str, args: &[Value]) -> Result<String, InterpolationError> {
    if args.is_empty() {
        return Ok(template.to_string());
    }

    let mut out = String::with_capacity(template.len());
    let mut next_arg = 0usize;
    let mut placeholders = 0usize;
    let mut chars = template.char_indices().peekable();

    while let Some((pos, c)) = chars.next() {
        match c {
            '{' => match chars.peek() {
                Some((_, '{')) => {
                    chars.next();
                    out.push('{');
                }
                Some((_, '}')) => {
                    chars.next();
                    placeholders += 1;
                    if let Some(arg) = args.get(next_arg) {
                        let _ = write!(out, "{arg}");
                    }
                    next_arg += 1;
                }
                _ => return Err(InterpolationError::UnmatchedBrace { brace: '{', position: pos }),
            },
            '}' => match chars.peek() {
                Some((_, '}')) => {
                    chars.next();
                    out.push('}');
                }
                _ => return Err(InterpolationError::UnmatchedBrace { brace: '}', position: pos }),
            },
            other => out.push(other),
        }
    }

    if placeholders != args.len() {
        return Err(InterpolationError::ArgCount {
            placeholders,
            args: args.len(),
        });
    }
    Ok(out)
}

/// Interpolate, or describe the template and arguments when that fails.
pub fn render_message(template: &str, args: &[Value]) -> String {
    interpolate(template, args).unwrap_or_else(|_| diagnostic(template, args))
}

fn diagnostic(template: &str, args: &[Value]) -> String {
    format!(
        "MSG={} ARGS={}",
        Value::from(template).repr(),
        Value::Tuple(args.to_vec()).repr()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fills_placeholders_in_order() {
        let args = [Value::from("ada"), Value::from(3i64)];
        assert_eq!(
            interpolate("user {} has {} items", &args).unwrap(),
            "user ada has 3 items"
        );
    }

    #[test]
    fn escaped_braces() {
        let args = [Value::from(1i64)];
        assert_eq!(interpolate("{{x}} = {}", &args).unwrap(), "{x} = 1");
    }

    #[test]
    fn no_args_is_verbatim() {
        assert_eq!(interpolate("raw {json: true}", &[]).unwrap(), "raw {json: true}");
    }

    #[test]
    fn count_mismatch_is_an_error() {
        let err = interpolate("{} {}", &[Value::from(1i64)]).unwrap_err();
        assert_eq!(err, InterpolationError::ArgCount { placeholders: 2, args: 1 });
        let err = interpolate("none", &[Value::from(1i64)]).unwrap_err();
        assert_eq!(err, InterpolationError::ArgCount { placeholders: 0, args: 1 });
    }

    #[test]
    fn unmatched_brace_is_an_error() {
        let err = interpolate("oops {", &[Value::from(1i64)]).unwrap_err();
        assert_eq!(err, InterpolationError::UnmatchedBrace { brace: '{', position: 5 });
    }

    #[test]
    fn failure_renders_diagnostic() {
        let msg = render_message("{} and {}", &[Value::from("only")]);
        assert_eq!(msg, r#"MSG="{} and {}" ARGS=("only")"#);
    }
}
