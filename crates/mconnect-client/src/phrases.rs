//! Fixed phrase table for backend domain messages.
//!
//! The cloud answers in Chinese. Known phrases are replaced in place so that
//! mixed messages ("部门不存在: 12") keep their context.

const PHRASES: &[(&str, &str)] = &[
    ("部门不存在", "Department does not exist"),
    ("用户不存在", "User not found"),
    ("卡号已存在", "Card number already exists"),
    ("权限不足", "Permission denied"),
    ("未找到", "Not found"),
    ("成功", "Success"),
    ("失败", "Failed"),
];

pub fn translate(message: &str) -> String {
    PHRASES
        .iter()
        .fold(message.to_string(), |acc, (from, to)| acc.replace(from, to))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_phrases() {
        assert_eq!(translate("部门不存在"), "Department does not exist");
        assert_eq!(translate("卡号已存在"), "Card number already exists");
        assert_eq!(translate("权限不足"), "Permission denied");
        assert_eq!(translate("用户不存在"), "User not found");
    }

    #[test]
    fn test_partial_and_unknown() {
        assert_eq!(translate("操作失败: 未找到"), "操作Failed: Not found");
        assert_eq!(translate("quota exceeded"), "quota exceeded");
        assert_eq!(translate(""), "");
    }
}
