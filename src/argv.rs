//! Argument encoding — host-native strings to the runtime's wide encoding.
//!
//! The runtime misbehaves on a null or zero-length argument vector, so a
//! single empty argument is synthesized when the host supplies none.
//! Conversion prefers the runtime's own locale-aware decoder; runtimes
//! older than [`ApiVersion::DECODE_LOCALE`] fall back to the host C
//! library, measuring the wide length first and then converting. Each entry
//! remembers which allocator produced it so the two strategies never
//! cross-free.

use std::ffi::{CStr, CString, OsStr, OsString};
use std::ptr;

use libc::wchar_t;

use crate::runtime::{ApiVersion, DecodedWide, RuntimeApi};

// `libc` does not declare `mbstowcs` on this platform; bind it directly.
extern "C" {
    fn mbstowcs(dest: *mut wchar_t, src: *const libc::c_char, n: libc::size_t) -> libc::size_t;
}

/// One wide argument, tagged by allocation strategy.
enum WideArg {
    /// Allocated by the runtime's decoder; freed with the deallocator the
    /// decoder handed back.
    Decoded(DecodedWide),
    /// Widened with the host C library; ordinary owned memory.
    Widened(Vec<wchar_t>),
}

impl WideArg {
    fn as_ptr(&self) -> *const wchar_t {
        match self {
            WideArg::Decoded(w) => w.as_ptr(),
            WideArg::Widened(v) => v.as_ptr(),
        }
    }
}

/// Convert `argv` and hand it to the runtime's set-argv primitive.
///
/// A failure to convert any single argument abandons the whole vector and
/// leaves the runtime's arguments unset: one malformed argument is not
/// worth aborting an otherwise healthy startup. The encoded storage only
/// lives for this call — the runtime copies what it keeps.
pub fn set_interpreter_argv<R: RuntimeApi>(rt: &mut R, argv: &[OsString], add_cwd_to_path: bool) {
    let empty = [OsString::new()];
    let argv: &[OsString] = if argv.is_empty() { &empty } else { argv };

    let mut wide: Vec<WideArg> = Vec::with_capacity(argv.len());
    for arg in argv {
        let carg = match to_c_string(arg) {
            Some(c) => c,
            None => return,
        };
        match widen(rt, &carg) {
            Some(w) => wide.push(w),
            None => return,
        }
    }

    let ptrs: Vec<*const wchar_t> = wide.iter().map(WideArg::as_ptr).collect();
    if rt.version() >= ApiVersion::SET_ARGV_EX {
        rt.set_argv_ex(&ptrs, add_cwd_to_path);
    } else {
        // The plain primitive unconditionally prepends the current
        // directory to the search path, so it has to be removed again when
        // the caller opted out.
        rt.set_argv(&ptrs);
        if !add_cwd_to_path {
            rt.pop_search_path_front();
        }
    }
}

/// Host-native argument to a C string. An interior NUL cannot cross the C
/// boundary; it counts as an encoding failure like any other.
#[cfg(unix)]
fn to_c_string(arg: &OsStr) -> Option<CString> {
    use std::os::unix::ffi::OsStrExt;
    CString::new(arg.as_bytes()).ok()
}

/// Off unix the host-native bytes are not observable losslessly; anything
/// beyond UTF-8 counts as an encoding failure.
#[cfg(not(unix))]
fn to_c_string(arg: &OsStr) -> Option<CString> {
    CString::new(arg.to_str()?.as_bytes()).ok()
}

fn widen<R: RuntimeApi>(rt: &R, arg: &CStr) -> Option<WideArg> {
    if rt.version() >= ApiVersion::DECODE_LOCALE {
        rt.decode_locale(arg).map(WideArg::Decoded)
    } else {
        widen_with_host_locale(arg).map(WideArg::Widened)
    }
}

/// Multibyte-to-wide conversion with the host C library: measure the
/// required length, then allocate and convert.
fn widen_with_host_locale(arg: &CStr) -> Option<Vec<wchar_t>> {
    let needed = unsafe { mbstowcs(ptr::null_mut(), arg.as_ptr(), 0) };
    if needed == usize::MAX {
        return None;
    }
    let mut buf = vec![0 as wchar_t; needed + 1];
    let written = unsafe { mbstowcs(buf.as_mut_ptr(), arg.as_ptr(), needed + 1) };
    if written == usize::MAX {
        return None;
    }
    Some(buf)
}
