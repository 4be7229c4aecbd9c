use crate::error::{Result, SymbindError};
use std::ffi::{c_char, CStr};
use std::marker::PhantomData;

/// UTF-8 text laid out as `{data, len}`, length in bytes, no NUL terminator.
///
/// Borrows its backing storage, so a view over a temporary cannot escape the
/// statement that created it.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct ForeignStr<'a> {
    data: *const u8,
    len: i64,
    _marker: PhantomData<&'a str>,
}

impl<'a> ForeignStr<'a> {
    pub fn new(text: &'a str) -> Self {
        Self {
            data: text.as_ptr(),
            len: text.len() as i64,
            _marker: PhantomData,
        }
    }

    /// Validates `bytes` as UTF-8 before viewing them.
    pub fn from_bytes(bytes: &'a [u8]) -> Result<Self> {
        let text = std::str::from_utf8(bytes).map_err(|e| {
            SymbindError::Marshal(format!("text is not valid UTF-8: {}", e))
        })?;
        Ok(Self::new(text))
    }

    pub fn len(&self) -> usize {
        self.len as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn as_str(&self) -> &'a str {
        // SAFETY: built only from a `&'a str`, so the bytes are live UTF-8.
        unsafe {
            std::str::from_utf8_unchecked(std::slice::from_raw_parts(self.data, self.len as usize))
        }
    }
}

/// Entry table for a list of texts, one [`ForeignStr`] per entry.
#[derive(Debug, Clone)]
pub struct ForeignStrList<'a> {
    entries: Vec<ForeignStr<'a>>,
}

/// `{data, len, cap}` header over a [`ForeignStrList`] entry table.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct RawStrList<'m> {
    data: *const ForeignStr<'m>,
    len: i64,
    cap: i64,
    _marker: PhantomData<&'m [ForeignStr<'m>]>,
}

impl<'a> ForeignStrList<'a> {
    pub fn new<S: AsRef<str>>(texts: &'a [S]) -> Self {
        Self {
            entries: texts.iter().map(|t| ForeignStr::new(t.as_ref())).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, i: usize) -> Option<&'a str> {
        self.entries.get(i).map(ForeignStr::as_str)
    }

    pub fn as_raw(&self) -> RawStrList<'_> {
        let entries: &[ForeignStr<'_>] = &self.entries;
        RawStrList {
            data: entries.as_ptr(),
            len: entries.len() as i64,
            cap: entries.len() as i64,
            _marker: PhantomData,
        }
    }
}

impl<'m> RawStrList<'m> {
    pub fn len(&self) -> usize {
        self.len as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn entries(&self) -> &'m [ForeignStr<'m>] {
        // SAFETY: points into an entry table borrowed for `'m`.
        unsafe { std::slice::from_raw_parts(self.data, self.len as usize) }
    }
}

/// Copies a NUL-terminated string returned by the foreign side into an owned
/// `String`. A null pointer or an empty string yields `None`.
///
/// # Safety
///
/// `ptr` must be null or point to a NUL-terminated buffer that stays valid
/// for the duration of this call.
pub unsafe fn take_foreign_string(ptr: *const c_char) -> Result<Option<String>> {
    if ptr.is_null() {
        return Ok(None);
    }
    let text = CStr::from_ptr(ptr)
        .to_str()
        .map_err(|e| SymbindError::Marshal(format!("returned text is not valid UTF-8: {}", e)))?;
    if text.is_empty() {
        return Ok(None);
    }
    Ok(Some(text.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CString;

    #[test]
    fn test_length_is_in_bytes() {
        let text = "é1";
        let view = ForeignStr::new(text);
        assert_eq!(view.len(), 3);
        assert_eq!(view.as_str(), "é1");
    }

    #[test]
    fn test_invalid_utf8_rejected() {
        let bytes = [0xffu8, 0xfe];
        assert!(matches!(ForeignStr::from_bytes(&bytes), Err(SymbindError::Marshal(_))));
    }

    #[test]
    fn test_list_preserves_order() {
        let names = vec!["X0".to_string(), "size".to_string(), "température".to_string()];
        let list = ForeignStrList::new(&names);
        let raw = list.as_raw();
        assert_eq!(raw.len(), 3);
        let read: Vec<&str> = raw.entries().iter().map(|e| e.as_str()).collect();
        assert_eq!(read, vec!["X0", "size", "température"]);
    }

    #[test]
    fn test_empty_list() {
        let names: Vec<String> = Vec::new();
        let list = ForeignStrList::new(&names);
        assert!(list.is_empty());
        assert!(list.as_raw().is_empty());
    }

    #[test]
    fn test_take_foreign_string() {
        let owned = CString::new("mul(X0, 2)").unwrap();
        let text = unsafe { take_foreign_string(owned.as_ptr()) }.unwrap();
        assert_eq!(text.as_deref(), Some("mul(X0, 2)"));

        let empty = CString::new("").unwrap();
        assert_eq!(unsafe { take_foreign_string(empty.as_ptr()) }.unwrap(), None);
        assert_eq!(unsafe { take_foreign_string(std::ptr::null()) }.unwrap(), None);
    }
}
