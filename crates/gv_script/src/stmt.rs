//! Statement scanning.
//!
//! One statement per whitespace-separated token. Forms are matched
//! structurally against the full token - a trailing or embedded stray
//! character makes the whole token malformed, never a prefix match.

use gv_core::Handle;

/// One script statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stmt {
    /// `w(N)` - pause N milliseconds.
    Wait(u32),
    /// `gc` - trigger a collection.
    Collect,
    /// `s` - dump collector state.
    Dump,
    /// `e` - end of script; remaining input is not processed.
    End,
    /// `A[B]=C` - point A's slot B at C.
    SetRef {
        obj: Handle,
        index: usize,
        target: Handle,
    },
    /// `A[B]` - clear A's slot B.
    ClearRef { obj: Handle, index: usize },
    /// `A=B` - create object A with B reference slots.
    Create { handle: Handle, slot_count: usize },
    /// `+A` - add a root reference to A.
    AddRoot(Handle),
    /// `-A` - drop a root reference from A.
    RemoveRoot(Handle),
    /// `A` - remove handle A from the handle table.
    DropHandle(Handle),
}

/// Scan a single token. `None` means the token matches no form.
pub fn scan_stmt(token: &str) -> Option<Stmt> {
    match *token.as_bytes().first()? {
        b'g' => (token == "gc").then_some(Stmt::Collect),
        b's' => (token == "s").then_some(Stmt::Dump),
        b'e' => (token == "e").then_some(Stmt::End),
        b'w' => {
            let millis = token.strip_prefix("w(")?.strip_suffix(')')?;
            Some(Stmt::Wait(parse_int(millis)?.try_into().ok()?))
        }
        b'+' => Some(Stmt::AddRoot(parse_handle(&token[1..])?)),
        b'-' => Some(Stmt::RemoveRoot(parse_handle(&token[1..])?)),
        b'0'..=b'9' => scan_object_stmt(token),
        _ => None,
    }
}

/// Forms headed by a handle: `A`, `A=B`, `A[B]`, `A[B]=C`.
fn scan_object_stmt(token: &str) -> Option<Stmt> {
    let (obj, rest) = split_int(token)?;
    let obj = Handle(obj.try_into().ok()?);
    if rest.is_empty() {
        return Some(Stmt::DropHandle(obj));
    }
    if let Some(count) = rest.strip_prefix('=') {
        return Some(Stmt::Create {
            handle: obj,
            slot_count: parse_int(count)? as usize,
        });
    }
    let rest = rest.strip_prefix('[')?;
    let (index, rest) = split_int(rest)?;
    let rest = rest.strip_prefix(']')?;
    if rest.is_empty() {
        return Some(Stmt::ClearRef {
            obj,
            index: index as usize,
        });
    }
    let target = rest.strip_prefix('=')?;
    Some(Stmt::SetRef {
        obj,
        index: index as usize,
        target: parse_handle(target)?,
    })
}

fn parse_handle(text: &str) -> Option<Handle> {
    Some(Handle(parse_int(text)?.try_into().ok()?))
}

/// Whole-token unsigned integer; rejects empty and non-digit input.
fn parse_int(text: &str) -> Option<u64> {
    let (value, rest) = split_int(text)?;
    rest.is_empty().then_some(value)
}

/// Leading digit run as an integer, plus the remainder of the token.
fn split_int(text: &str) -> Option<(u64, &str)> {
    let digits = text.bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 {
        return None;
    }
    let value: u64 = text[..digits].parse().ok()?;
    Some((value, &text[digits..]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scans_all_forms() {
        assert_eq!(scan_stmt("gc"), Some(Stmt::Collect));
        assert_eq!(scan_stmt("s"), Some(Stmt::Dump));
        assert_eq!(scan_stmt("e"), Some(Stmt::End));
        assert_eq!(scan_stmt("w(250)"), Some(Stmt::Wait(250)));
        assert_eq!(scan_stmt("+12"), Some(Stmt::AddRoot(Handle(12))));
        assert_eq!(scan_stmt("-0"), Some(Stmt::RemoveRoot(Handle(0))));
        assert_eq!(scan_stmt("7"), Some(Stmt::DropHandle(Handle(7))));
        assert_eq!(
            scan_stmt("3=8"),
            Some(Stmt::Create {
                handle: Handle(3),
                slot_count: 8
            })
        );
        assert_eq!(
            scan_stmt("3[2]"),
            Some(Stmt::ClearRef {
                obj: Handle(3),
                index: 2
            })
        );
        assert_eq!(
            scan_stmt("3[2]=9"),
            Some(Stmt::SetRef {
                obj: Handle(3),
                index: 2,
                target: Handle(9)
            })
        );
    }

    #[test]
    fn rejects_partial_and_stray_tokens() {
        for bad in [
            "", "g", "gcc", "ss", "w", "w()", "w(1", "w(x)", "+", "-", "+x", "3=", "3=x", "3[",
            "3[]", "3[1", "3[1]=", "3[1]x", "12a", "=3", "[1]", "e2",
        ] {
            assert_eq!(scan_stmt(bad), None, "token {bad:?} should be rejected");
        }
    }
}
