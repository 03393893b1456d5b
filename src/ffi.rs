//! FFI bindings for the tindex engine
//!
//! C-compatible entry points so the mobile client can call the same scoring
//! engine the backend uses. All functions take and return null-terminated
//! JSON strings; returned memory must be freed with `tindex_free_string`.
//! On error the functions return NULL and `tindex_last_error` reports why.

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;

use crate::error::EngineError;
use crate::pipeline::{apply_task_update, compute_statistics, TaskUpdateOutcome};
use crate::program::UserProgram;
use crate::request::TaskUpdateRequest;
use chrono::NaiveDate;
use serde::Serialize;

// Thread-local storage for the last error message
thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

fn set_last_error(msg: &str) {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = CString::new(msg).ok();
    });
}

fn clear_last_error() {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = None;
    });
}

/// Helper to convert a C string to a Rust string
unsafe fn cstr_to_string(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    CStr::from_ptr(ptr).to_str().ok().map(|s| s.to_string())
}

/// Helper to convert a Rust string to a C string (caller must free)
fn string_to_cstr(s: &str) -> *mut c_char {
    match CString::new(s) {
        Ok(cstr) => cstr.into_raw(),
        Err(_) => ptr::null_mut(),
    }
}

fn parse_today(raw: &str) -> Result<NaiveDate, EngineError> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|e| EngineError::DateParseError(format!("'{raw}': {e}")))
}

/// Updated program plus the update outcome, returned as one JSON document.
#[derive(Serialize)]
struct UpdateResult {
    program: UserProgram,
    outcome: TaskUpdateOutcome,
}

/// Compute the statistics snapshot for a program JSON document.
///
/// # Safety
/// - `program_json` and `today` must be valid null-terminated C strings
///   (`today` formatted YYYY-MM-DD).
/// - Returns a newly allocated string that must be freed with
///   `tindex_free_string`.
/// - Returns NULL on error; call `tindex_last_error` for the message.
#[no_mangle]
pub unsafe extern "C" fn tindex_compute_statistics(
    program_json: *const c_char,
    today: *const c_char,
) -> *mut c_char {
    clear_last_error();

    let Some(program_str) = cstr_to_string(program_json) else {
        set_last_error("Invalid program string pointer");
        return ptr::null_mut();
    };
    let Some(today_str) = cstr_to_string(today) else {
        set_last_error("Invalid date string pointer");
        return ptr::null_mut();
    };

    let program = match UserProgram::from_json(&program_str) {
        Ok(program) => program,
        Err(e) => {
            set_last_error(&e.to_string());
            return ptr::null_mut();
        }
    };
    let today = match parse_today(&today_str) {
        Ok(today) => today,
        Err(e) => {
            set_last_error(&e.to_string());
            return ptr::null_mut();
        }
    };

    let snapshot = compute_statistics(&program, today);
    match serde_json::to_string(&snapshot) {
        Ok(json) => string_to_cstr(&json),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// Apply one task update and return `{program, outcome}` as JSON.
///
/// # Safety
/// - `program_json`, `request_json`, and `today` must be valid
///   null-terminated C strings (`today` formatted YYYY-MM-DD).
/// - Returns a newly allocated string that must be freed with
///   `tindex_free_string`.
/// - Returns NULL on error; call `tindex_last_error` for the message.
#[no_mangle]
pub unsafe extern "C" fn tindex_apply_task_update(
    program_json: *const c_char,
    request_json: *const c_char,
    today: *const c_char,
) -> *mut c_char {
    clear_last_error();

    let Some(program_str) = cstr_to_string(program_json) else {
        set_last_error("Invalid program string pointer");
        return ptr::null_mut();
    };
    let Some(request_str) = cstr_to_string(request_json) else {
        set_last_error("Invalid request string pointer");
        return ptr::null_mut();
    };
    let Some(today_str) = cstr_to_string(today) else {
        set_last_error("Invalid date string pointer");
        return ptr::null_mut();
    };

    let mut program = match UserProgram::from_json(&program_str) {
        Ok(program) => program,
        Err(e) => {
            set_last_error(&e.to_string());
            return ptr::null_mut();
        }
    };
    let request: TaskUpdateRequest = match serde_json::from_str(&request_str) {
        Ok(request) => request,
        Err(e) => {
            set_last_error(&e.to_string());
            return ptr::null_mut();
        }
    };
    let today = match parse_today(&today_str) {
        Ok(today) => today,
        Err(e) => {
            set_last_error(&e.to_string());
            return ptr::null_mut();
        }
    };

    let outcome = match apply_task_update(&mut program, &request, today) {
        Ok(outcome) => outcome,
        Err(e) => {
            set_last_error(&e.to_string());
            return ptr::null_mut();
        }
    };

    let result = UpdateResult { program, outcome };
    match serde_json::to_string(&result) {
        Ok(json) => string_to_cstr(&json),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// Get the last error message, or NULL if the last call succeeded.
///
/// # Safety
/// The returned pointer is valid until the next engine call on this thread;
/// do not free it.
#[no_mangle]
pub unsafe extern "C" fn tindex_last_error() -> *const c_char {
    LAST_ERROR.with(|e| {
        e.borrow()
            .as_ref()
            .map(|msg| msg.as_ptr())
            .unwrap_or(ptr::null())
    })
}

/// Free a string returned by this library.
///
/// # Safety
/// `ptr` must be a pointer previously returned by a tindex function, or NULL.
#[no_mangle]
pub unsafe extern "C" fn tindex_free_string(ptr: *mut c_char) {
    if !ptr.is_null() {
        drop(CString::from_raw(ptr));
    }
}
