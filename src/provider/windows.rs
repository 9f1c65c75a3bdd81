use core::ptr::null_mut;
use std::path::Path;

use widestring::U16CString;
use windows_sys::Win32::Foundation::{ERROR_SUCCESS, GetLastError, LocalFree};
use windows_sys::Win32::Security::Authorization::{
    ConvertSecurityDescriptorToStringSecurityDescriptorW,
    ConvertStringSecurityDescriptorToSecurityDescriptorW, GetNamedSecurityInfoW, SDDL_REVISION_1,
    SE_FILE_OBJECT, SetNamedSecurityInfoW,
};
use windows_sys::Win32::Security::{
    ACL, DACL_SECURITY_INFORMATION, GROUP_SECURITY_INFORMATION, GetSecurityDescriptorDacl,
    GetSecurityDescriptorGroup, GetSecurityDescriptorOwner, GetSecurityDescriptorSacl,
    OWNER_SECURITY_INFORMATION, PSECURITY_DESCRIPTOR, PSID, SACL_SECURITY_INFORMATION,
};

use super::{ProviderError, SecurityProvider};

/// Owner, group and discretionary list. Reading the system list requires
/// `SeSecurityPrivilege` and is not requested here; a SACL rendered by this
/// crate is still applied on write when present in the text.
const READ_INFORMATION: u32 =
    OWNER_SECURITY_INFORMATION | GROUP_SECURITY_INFORMATION | DACL_SECURITY_INFORMATION;

/// [`SecurityProvider`] for filesystem objects, files and directories alike,
/// backed by the named-object security APIs.
///
/// Descriptors cross this boundary only as SDDL text: reads convert the
/// object's binary descriptor to text, writes convert text back and apply
/// exactly the parts the text carries.
#[derive(Debug, Clone, Copy, Default)]
pub struct ObjectSecurityProvider;

impl SecurityProvider for ObjectSecurityProvider {
    fn read_descriptor(&self, path: &Path) -> Result<String, ProviderError> {
        let wide = wide_path(path)?;
        let mut descriptor: PSECURITY_DESCRIPTOR = null_mut();
        // SAFETY: `wide` is NUL-terminated, the unrequested out-pointers are
        // null and `descriptor` is a valid out-pointer.
        let code = unsafe {
            GetNamedSecurityInfoW(
                wide.as_ptr(),
                SE_FILE_OBJECT,
                READ_INFORMATION,
                null_mut(),
                null_mut(),
                null_mut(),
                null_mut(),
                &raw mut descriptor,
            )
        };
        if code != ERROR_SUCCESS {
            return Err(ProviderError::Api {
                api: "GetNamedSecurityInfoW",
                code,
            });
        }
        let text = descriptor_to_text(descriptor);
        // SAFETY: `descriptor` was allocated by `GetNamedSecurityInfoW` and
        // must be released with `LocalFree`.
        unsafe {
            LocalFree(descriptor);
        }
        text
    }

    fn write_descriptor(&self, path: &Path, sddl: &str) -> Result<(), ProviderError> {
        let wide = wide_path(path)?;
        let text = U16CString::from_str(sddl).map_err(|_| ProviderError::Rejected {
            reason: "descriptor text contains an interior NUL byte".to_owned(),
        })?;
        let mut descriptor: PSECURITY_DESCRIPTOR = null_mut();
        // SAFETY: `text` is NUL-terminated and `descriptor` is a valid
        // out-pointer; the returned size is not needed.
        let converted = unsafe {
            ConvertStringSecurityDescriptorToSecurityDescriptorW(
                text.as_ptr(),
                SDDL_REVISION_1,
                &raw mut descriptor,
                null_mut(),
            )
        };
        if converted == 0 {
            return Err(last_error("ConvertStringSecurityDescriptorToSecurityDescriptorW"));
        }
        let result = apply_parts(descriptor, &wide);
        // SAFETY: `descriptor` was allocated by the conversion and must be
        // released with `LocalFree`.
        unsafe {
            LocalFree(descriptor);
        }
        result
    }
}

fn wide_path(path: &Path) -> Result<U16CString, ProviderError> {
    U16CString::from_os_str(path.as_os_str()).map_err(|_| ProviderError::InvalidPath)
}

fn last_error(api: &'static str) -> ProviderError {
    ProviderError::Api {
        api,
        // SAFETY: `GetLastError` is always safe to call.
        code: unsafe { GetLastError() },
    }
}

fn descriptor_to_text(descriptor: PSECURITY_DESCRIPTOR) -> Result<String, ProviderError> {
    let mut text_ptr: *mut u16 = null_mut();
    let mut text_len = 0u32;
    // SAFETY: `descriptor` is a valid security descriptor and both
    // out-pointers are valid.
    let converted = unsafe {
        ConvertSecurityDescriptorToStringSecurityDescriptorW(
            descriptor,
            SDDL_REVISION_1,
            READ_INFORMATION,
            &raw mut text_ptr,
            &raw mut text_len,
        )
    };
    if converted == 0 {
        return Err(last_error("ConvertSecurityDescriptorToStringSecurityDescriptorW"));
    }
    // SAFETY: on success `text_ptr` points at `text_len` wide characters
    // allocated by the API.
    let units = unsafe { core::slice::from_raw_parts(text_ptr, text_len as usize) };
    let text = String::from_utf16_lossy(units)
        .trim_end_matches('\0')
        .to_owned();
    // SAFETY: the API allocated `text_ptr` with `LocalAlloc`.
    unsafe {
        LocalFree(text_ptr.cast());
    }
    Ok(text)
}

fn apply_parts(descriptor: PSECURITY_DESCRIPTOR, wide: &U16CString) -> Result<(), ProviderError> {
    let mut owner: PSID = null_mut();
    let mut owner_defaulted = 0i32;
    // SAFETY: `descriptor` is valid and all out-pointers are valid.
    let got = unsafe {
        GetSecurityDescriptorOwner(descriptor, &raw mut owner, &raw mut owner_defaulted)
    };
    if got == 0 {
        return Err(last_error("GetSecurityDescriptorOwner"));
    }
    let mut group: PSID = null_mut();
    let mut group_defaulted = 0i32;
    // SAFETY: `descriptor` is valid and all out-pointers are valid.
    let got = unsafe {
        GetSecurityDescriptorGroup(descriptor, &raw mut group, &raw mut group_defaulted)
    };
    if got == 0 {
        return Err(last_error("GetSecurityDescriptorGroup"));
    }
    let mut dacl_present = 0i32;
    let mut dacl: *mut ACL = null_mut();
    let mut dacl_defaulted = 0i32;
    // SAFETY: `descriptor` is valid and all out-pointers are valid.
    let got = unsafe {
        GetSecurityDescriptorDacl(
            descriptor,
            &raw mut dacl_present,
            &raw mut dacl,
            &raw mut dacl_defaulted,
        )
    };
    if got == 0 {
        return Err(last_error("GetSecurityDescriptorDacl"));
    }
    let mut sacl_present = 0i32;
    let mut sacl: *mut ACL = null_mut();
    let mut sacl_defaulted = 0i32;
    // SAFETY: `descriptor` is valid and all out-pointers are valid.
    let got = unsafe {
        GetSecurityDescriptorSacl(
            descriptor,
            &raw mut sacl_present,
            &raw mut sacl,
            &raw mut sacl_defaulted,
        )
    };
    if got == 0 {
        return Err(last_error("GetSecurityDescriptorSacl"));
    }

    // Only the parts the descriptor text actually carried are replaced.
    let mut info = 0u32;
    if !owner.is_null() {
        info |= OWNER_SECURITY_INFORMATION;
    }
    if !group.is_null() {
        info |= GROUP_SECURITY_INFORMATION;
    }
    if dacl_present != 0 {
        info |= DACL_SECURITY_INFORMATION;
    }
    if sacl_present != 0 {
        info |= SACL_SECURITY_INFORMATION;
    }

    // SAFETY: the object name is NUL-terminated; the part pointers stay
    // valid for the duration of the call because `descriptor` outlives it.
    let code = unsafe {
        SetNamedSecurityInfoW(
            wide.as_ptr().cast_mut(),
            SE_FILE_OBJECT,
            info,
            owner,
            group,
            dacl,
            sacl,
        )
    };
    if code == ERROR_SUCCESS {
        Ok(())
    } else {
        Err(ProviderError::Api {
            api: "SetNamedSecurityInfoW",
            code,
        })
    }
}
