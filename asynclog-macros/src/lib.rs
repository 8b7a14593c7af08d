//! Level macros for asynclog.
//!
//! Every macro accepts either a format string with arguments, logging to the
//! global logger, or a logger expression followed by the format string:
//!
//! ```ignore
//! asynclog::info!("started in {:?}", elapsed);
//! asynclog::warn!(logger, "queue depth {}", depth);
//! ```
//!
//! The call-site (`file!()`, `line!()`) is captured at the invocation and the
//! format string is checked at compile time through `format_args!`.
//!
//! The handle form evaluates to the `Result<Emit>` of `Logger::output_at`.
//! The global form evaluates to `Option<Result<Emit>>`, `None` when no global
//! logger is installed.
extern crate proc_macro;

use proc_macro::{Delimiter, Group, Ident, Literal, Punct, Spacing, Span, TokenStream, TokenTree};

fn chr(ch: char) -> TokenTree {
    TokenTree::Punct(Punct::new(ch, Spacing::Alone))
}
fn j(ch: char) -> TokenTree {
    TokenTree::Punct(Punct::new(ch, Spacing::Joint))
}

fn braced(ts: TokenStream) -> TokenTree {
    TokenTree::Group(Group::new(Delimiter::Brace, ts))
}

fn parens(tokens: Vec<TokenTree>) -> TokenTree {
    TokenTree::Group(Group::new(
        Delimiter::Parenthesis,
        TokenStream::from_iter(tokens),
    ))
}

macro_rules! tok {
    ($ident:ident) => {
        TokenTree::Ident(Ident::new(stringify!($ident), Span::call_site()))
    };
    (()) => {
        TokenTree::Group(Group::new(Delimiter::Parenthesis, TokenStream::default()))
    };
    (( $($tt:tt)*) ) => {
        TokenTree::Group(Group::new(Delimiter::Parenthesis, TokenStream::from_iter(toks!($($tt)*))))
    };
    ({$($tt:tt)*}) => { $($tt)* };
    (%) => { j(':') };
    (:) => { chr(':') };
    (!) => { chr('!') };
    (.) => { chr('.') };
    (;) => { chr(';') };
    (,) => { chr(',') };
}

macro_rules! toks {
    ($($tt:tt)*) => {
        [$(tok!($tt)),*]
    }
}

fn is_char(tt: &TokenTree, ch: char) -> bool {
    if let TokenTree::Punct(p) = tt {
        if p.as_char() == ch {
            return true;
        }
    }
    false
}

// Literals forwarded through `macro_rules!` fragments arrive wrapped in an
// invisible group.
fn is_string_literal(tt: &TokenTree) -> bool {
    match tt {
        TokenTree::Literal(lit) => {
            let text = lit.to_string();
            text.starts_with('"') || text.starts_with("r\"") || text.starts_with("r#")
        }
        TokenTree::Group(group) if group.delimiter() == Delimiter::None => {
            let mut inner = group.stream().into_iter();
            match (inner.next(), inner.next()) {
                (Some(first), None) => is_string_literal(&first),
                _ => false,
            }
        }
        _ => false,
    }
}

/// Splits the macro input into an optional logger expression and the
/// format arguments.
fn split_target(
    tokens: Vec<TokenTree>,
) -> Result<(Option<Vec<TokenTree>>, Vec<TokenTree>), &'static str> {
    let Some(first) = tokens.first() else {
        return Err("expected a format string");
    };
    if is_string_literal(first) {
        return Ok((None, tokens));
    }
    let Some(comma) = tokens.iter().position(|tt| is_char(tt, ',')) else {
        return Err("expected a format string after the logger");
    };
    let mut target = tokens;
    let args = target.split_off(comma + 1);
    target.pop();
    if target.is_empty() {
        return Err("expected a logger expression before `,`");
    }
    match args.first() {
        Some(tt) if is_string_literal(tt) => Ok((Some(target), args)),
        _ => Err("expected a format string after the logger"),
    }
}

fn compile_error(msg: &str) -> TokenStream {
    TokenStream::from_iter(toks![
        compile_error!{ parens(vec![TokenTree::Literal(Literal::string(msg))]) };
    ])
}

fn emit_log(input: TokenStream, level: &str) -> TokenStream {
    let (target, args) = match split_target(input.into_iter().collect()) {
        Ok(split) => split,
        Err(msg) => return compile_error(msg),
    };
    let log_level = TokenTree::Ident(Ident::new(level, Span::call_site()));
    let mut call = Vec::with_capacity(32);
    call.extend(toks![
        asynclog%:LogLevel%:{log_level},
        asynclog%:CallSite%:new(file!(), line!()),
        format_args!{ parens(args) }
    ]);

    let mut out = TokenStream::new();
    match target {
        Some(target) => out.extend(toks![
            { parens(target) }.output_at{ parens(call) }
        ]),
        None => out.extend(toks![
            asynclog%:__private%:global_output{ parens(call) }
        ]),
    }
    TokenStream::from_iter([braced(out)])
}

#[proc_macro]
pub fn trace(input: TokenStream) -> TokenStream {
    emit_log(input, "Trace")
}

#[proc_macro]
pub fn debug(input: TokenStream) -> TokenStream {
    emit_log(input, "Debug")
}

#[proc_macro]
pub fn info(input: TokenStream) -> TokenStream {
    emit_log(input, "Info")
}

#[proc_macro]
pub fn warn(input: TokenStream) -> TokenStream {
    emit_log(input, "Warn")
}

#[proc_macro]
pub fn error(input: TokenStream) -> TokenStream {
    emit_log(input, "Error")
}

#[proc_macro]
pub fn syserror(input: TokenStream) -> TokenStream {
    emit_log(input, "SysError")
}

/// Writes the record synchronously and aborts the process.
#[proc_macro]
pub fn fatal(input: TokenStream) -> TokenStream {
    emit_log(input, "Fatal")
}

/// Written regardless of the level threshold.
#[proc_macro]
pub fn critical(input: TokenStream) -> TokenStream {
    emit_log(input, "Critical")
}
