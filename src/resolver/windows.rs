use core::ptr::{null, null_mut};

use widestring::U16CString;
use windows_sys::Win32::Foundation::{
    ERROR_INSUFFICIENT_BUFFER, ERROR_INVALID_SID, ERROR_NONE_MAPPED, GetLastError, LocalFree,
};
use windows_sys::Win32::Security::Authorization::ConvertStringSidToSidW;
use windows_sys::Win32::Security::{LookupAccountSidW, PSID};

use super::{IdentityResolver, ResolveError};

/// [`IdentityResolver`] backed by the local machine's account database
/// (`LookupAccountSidW`).
///
/// Resolves raw SID text to `DOMAIN\Name`; a SID with no mapped account
/// yields [`ResolveError::NoneMapped`].
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalAccountResolver;

impl IdentityResolver for LocalAccountResolver {
    fn resolve(&self, identity: &str) -> Result<String, ResolveError> {
        let wide = U16CString::from_str(identity).map_err(|_| ResolveError::InvalidFormat {
            identity: identity.to_owned(),
        })?;
        let mut psid: PSID = null_mut();
        // SAFETY: `wide` is a valid NUL-terminated UTF-16 string and `psid`
        // is a valid out-pointer.
        let converted = unsafe { ConvertStringSidToSidW(wide.as_ptr(), &raw mut psid) };
        if converted == 0 {
            // SAFETY: `GetLastError` is always safe to call.
            let code = unsafe { GetLastError() };
            return Err(if code == ERROR_INVALID_SID {
                ResolveError::InvalidFormat {
                    identity: identity.to_owned(),
                }
            } else {
                map_code(identity, code)
            });
        }
        let result = lookup_account(psid, identity);
        // SAFETY: `psid` was allocated by `ConvertStringSidToSidW` and must
        // be released with `LocalFree`.
        unsafe {
            LocalFree(psid.cast());
        }
        result
    }
}

fn lookup_account(psid: PSID, identity: &str) -> Result<String, ResolveError> {
    let mut name_len = 0u32;
    let mut domain_len = 0u32;
    let mut sid_type_raw = 0i32;
    // SAFETY: null buffers with zero lengths are the documented way to query
    // the required sizes; all out-pointers are valid.
    let sized = unsafe {
        LookupAccountSidW(
            null(),
            psid,
            null_mut(),
            &raw mut name_len,
            null_mut(),
            &raw mut domain_len,
            &raw mut sid_type_raw,
        )
    };
    if sized == 0 {
        // SAFETY: `GetLastError` is always safe to call.
        let code = unsafe { GetLastError() };
        if code != ERROR_INSUFFICIENT_BUFFER {
            return Err(map_code(identity, code));
        }
    }

    let mut name_buffer = vec![0u16; name_len as usize];
    let mut domain_buffer = vec![0u16; domain_len as usize];
    // SAFETY: both buffers were allocated with the lengths the first call
    // reported, and all out-pointers are valid.
    let looked_up = unsafe {
        LookupAccountSidW(
            null(),
            psid,
            name_buffer.as_mut_ptr(),
            &raw mut name_len,
            domain_buffer.as_mut_ptr(),
            &raw mut domain_len,
            &raw mut sid_type_raw,
        )
    };
    if looked_up == 0 {
        // SAFETY: `GetLastError` is always safe to call.
        let code = unsafe { GetLastError() };
        return Err(map_code(identity, code));
    }

    // On success the reported lengths exclude the NUL terminator.
    let name = name_buffer
        .get(..name_len as usize)
        .map(String::from_utf16_lossy)
        .unwrap_or_default();
    let domain = domain_buffer
        .get(..domain_len as usize)
        .map(String::from_utf16_lossy)
        .unwrap_or_default();
    Ok(if domain.is_empty() {
        name
    } else {
        format!("{domain}\\{name}")
    })
}

fn map_code(identity: &str, code: u32) -> ResolveError {
    if code == ERROR_NONE_MAPPED {
        ResolveError::NoneMapped {
            identity: identity.to_owned(),
        }
    } else {
        ResolveError::Lookup {
            identity: identity.to_owned(),
            code,
        }
    }
}
