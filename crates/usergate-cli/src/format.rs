use usergate_core::models::User;

const NAME_WIDTH: usize = 24;
const EMAIL_WIDTH: usize = 32;
const ID_WIDTH: usize = 26;

/// Truncate a string to a maximum length, adding ellipsis if needed
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        s.chars().take(max_len).collect()
    } else {
        let truncated: String = s.chars().take(max_len - 3).collect();
        format!("{}...", truncated)
    }
}

pub fn user_table(users: &[User]) -> String {
    let mut out = format!(
        "{:<nw$}  {:<ew$}  {:<iw$}  {}\n",
        "NAME",
        "EMAIL",
        "ID",
        "CREATED",
        nw = NAME_WIDTH,
        ew = EMAIL_WIDTH,
        iw = ID_WIDTH,
    );
    for user in users {
        out.push_str(&format!(
            "{:<nw$}  {:<ew$}  {:<iw$}  {}\n",
            truncate_string(&user.name, NAME_WIDTH),
            truncate_string(&user.email, EMAIL_WIDTH),
            truncate_string(&user.id, ID_WIDTH),
            user.created_display(),
            nw = NAME_WIDTH,
            ew = EMAIL_WIDTH,
            iw = ID_WIDTH,
        ));
    }
    out
}

pub fn user_profile(user: &User) -> String {
    format!(
        "Name:    {}\nEmail:   {}\nId:      {}\nCreated: {}",
        user.name,
        user.email,
        user.id,
        user.created_display()
    )
}
