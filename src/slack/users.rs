use crate::slack::api::User;

fn clean(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Best human-readable label for a user record.
pub fn display_name(user: &User) -> String {
    let profile = user.profile.as_ref();
    clean(profile.and_then(|p| p.display_name.as_deref()))
        .or_else(|| clean(profile.and_then(|p| p.real_name.as_deref())))
        .or_else(|| clean(user.name.as_deref()))
        .or_else(|| clean(user.id.as_deref()))
        .unwrap_or("unknown")
        .to_string()
}
