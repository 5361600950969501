use std::fmt;

use serde::de::{MapAccess, Visitor, value::MapAccessDeserializer};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::AppError;

const MISSING_FIELDS_MESSAGE: &str = "Missing username or phone";

/// 字段缺失与显式 null 都反序列化为 `None`，由 `validate` 统一拒绝
#[derive(Debug)]
pub struct CheckUserRequest {
    pub username: Option<String>,
    pub phone: Option<String>,
}

#[derive(Deserialize)]
struct CheckUserFields {
    username: Option<String>,
    phone: Option<String>,
}

// 只接受 JSON 对象，派生实现会把 ["alice", "555-0100"] 这样的数组也按字段顺序解析
impl<'de> Deserialize<'de> for CheckUserRequest {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_map(CheckUserVisitor)
    }
}

struct CheckUserVisitor;

impl<'de> Visitor<'de> for CheckUserVisitor {
    type Value = CheckUserRequest;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("an object with username and phone")
    }

    fn visit_map<A>(self, map: A) -> Result<Self::Value, A::Error>
    where
        A: MapAccess<'de>,
    {
        let fields = CheckUserFields::deserialize(MapAccessDeserializer::new(map))?;
        Ok(CheckUserRequest {
            username: fields.username,
            phone: fields.phone,
        })
    }
}

impl CheckUserRequest {
    pub fn validate(self) -> Result<(String, String), AppError> {
        match (self.username, self.phone) {
            (Some(username), Some(phone)) => Ok((username, phone)),
            _ => Err(AppError::InvalidInput(MISSING_FIELDS_MESSAGE.to_string())),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CheckUserResponse {
    pub message: String,
}
