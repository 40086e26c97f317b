//! HTML escaping and the fixed document chrome shared by every export.

use std::borrow::Cow;
use std::io::{self, Write};
use std::time::Duration;

pub const GENERATOR: &str = "skypescape";

const BASE_STYLE: &str = "\
body { font-family: Helvetica, Verdana, Arial, sans-serif; font-size: small;}
table { width: 100%; }
#footer {font-size: xx-small; }
td.timestamp { font-size: x-small; text-align: center;}
.row_even { background-color: #D4F1FC; }
";

/// Static description of one kind of exported table.
#[derive(Debug)]
pub struct Layout {
    pub title: &'static str,
    /// Column widths in percent, one `<col>` each.
    pub column_widths: &'static [u8],
    pub headers: &'static [&'static str],
    pub extra_style: &'static str,
}

/// Escape text content (`&`, `<`, `>`).
pub fn escape_text(input: &str) -> Cow<'_, str> {
    escape(input, false)
}

/// Escape a value placed inside a double-quoted attribute.
pub fn escape_attr(input: &str) -> Cow<'_, str> {
    escape(input, true)
}

fn escape(input: &str, quotes: bool) -> Cow<'_, str> {
    let needs = |c: char| matches!(c, '&' | '<' | '>') || (quotes && matches!(c, '"' | '\''));
    if !input.contains(needs) {
        return Cow::Borrowed(input);
    }
    let mut out = String::with_capacity(input.len() + 16);
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if quotes => out.push_str("&quot;"),
            '\'' if quotes => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    Cow::Owned(out)
}

pub fn write_header<W: Write + ?Sized>(out: &mut W, layout: &Layout) -> io::Result<()> {
    write!(
        out,
        "<!DOCTYPE html><html><head>\n\
         <meta charset=\"utf-8\"/>\n\
         <meta http-equiv=\"Content-Type\" content=\"text/html; charset=utf-8\"/>\n\
         <title>{}</title></head>\n<style>\n{}{}</style>\n<body><table>\n",
        escape_text(layout.title),
        BASE_STYLE,
        layout.extra_style
    )?;
    for width in layout.column_widths {
        writeln!(out, "<col style=\"width:{}%\">", width)?;
    }
    write!(out, "<thead>\n<tr>")?;
    for header in layout.headers {
        write!(out, "<th>{}</th>", escape_text(header))?;
    }
    write!(out, "</tr>\n</thead><tbody>\n")
}

pub fn write_footer<W: Write + ?Sized>(out: &mut W, elapsed: Duration) -> io::Result<()> {
    write!(
        out,
        "</tbody></table><div id=\"footer\">Exported by {} in {:.6} seconds.</div></body></html>",
        GENERATOR,
        elapsed.as_secs_f64()
    )
}
