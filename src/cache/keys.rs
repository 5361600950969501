/// 生成用户手机号缓存键
///
/// 前缀默认为空，此时键就是用户名本身，与已有部署中的缓存数据兼容
pub fn user_phone_key(prefix: &str, username: &str) -> String {
    format!("{}{}", prefix, username)
}
