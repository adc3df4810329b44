use once_cell::sync::Lazy;
use regex::Regex;

static USERNAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_.-]+$").expect("Invalid username regex"));

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}$").expect("Invalid email regex")
});

const WEAK_PASSWORDS: [&str; 8] = [
    "password",
    "12345678",
    "123456789",
    "qwerty123",
    "password1",
    "abcd1234",
    "clonelab1",
    "sequence1",
];

pub fn validate_username(username: &str) -> Result<(), &'static str> {
    // 长度 3..=32
    if username.len() < 3 || username.len() > 32 {
        return Err("Username length must be between 3 and 32 characters");
    }
    if !USERNAME_RE.is_match(username) {
        return Err("Username must contain only letters, numbers, dots, underscores or hyphens");
    }
    Ok(())
}

pub fn validate_email(email: &str) -> Result<(), &'static str> {
    if !EMAIL_RE.is_match(email) {
        return Err("Email format is invalid");
    }
    Ok(())
}

/// 密码策略：至少 8 位，包含大小写字母与数字，且不在常见弱密码表中
///
/// 返回全部未满足的规则。
pub fn password_policy_violations(password: &str) -> Vec<&'static str> {
    let mut errors = Vec::new();

    if password.chars().count() < 8 {
        errors.push("Password must be at least 8 characters long");
    }
    if !password.chars().any(|c| c.is_ascii_uppercase()) {
        errors.push("Password must contain at least one uppercase letter");
    }
    if !password.chars().any(|c| c.is_ascii_lowercase()) {
        errors.push("Password must contain at least one lowercase letter");
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        errors.push("Password must contain at least one digit");
    }
    if WEAK_PASSWORDS
        .iter()
        .any(|weak| password.eq_ignore_ascii_case(weak))
    {
        errors.push("Password is too common, please choose a stronger password");
    }

    errors
}

pub fn validate_password(password: &str) -> Result<(), String> {
    let errors = password_policy_violations(password);
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors.join("; "))
    }
}

/// 校验讨论消息，返回去除首尾空白后的内容
pub fn validate_message_content(content: &str, max_chars: usize) -> Result<&str, String> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return Err("Message content must not be empty".to_string());
    }
    let len = trimmed.chars().count();
    if len > max_chars {
        return Err(format!(
            "Message content is too long ({len} characters, at most {max_chars})"
        ));
    }
    Ok(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_username_rules() {
        assert!(validate_username("student.one").is_ok());
        assert!(validate_username("ab").is_err());
        assert!(validate_username("has space").is_err());
    }

    #[test]
    fn test_email_rules() {
        assert!(validate_email("someone@example.edu").is_ok());
        assert!(validate_email("someone@localhost").is_err());
        assert!(validate_email("no-at-sign.com").is_err());
    }

    #[test]
    fn test_strong_password_accepted() {
        assert!(validate_password("SecurePass123").is_ok());
        assert!(validate_password("MyP@ssw0rd").is_ok());
    }

    #[test]
    fn test_password_violations_are_listed() {
        let errors = password_policy_violations("abcd1234");
        assert!(errors.contains(&"Password must contain at least one uppercase letter"));
        assert!(errors.contains(&"Password is too common, please choose a stronger password"));

        let errors = password_policy_violations("Ab1");
        assert!(errors.contains(&"Password must be at least 8 characters long"));
    }

    #[test]
    fn test_message_content_trimmed() {
        assert_eq!(validate_message_content("  hello \n", 10), Ok("hello"));
    }

    #[test]
    fn test_message_content_rejects_blank_and_long() {
        assert!(validate_message_content("   ", 10).is_err());
        assert!(validate_message_content("", 10).is_err());
        assert!(validate_message_content("abcdefghijk", 10).is_err());
        // 按字符计数
        assert!(validate_message_content("测序结果正确", 6).is_ok());
    }
}
