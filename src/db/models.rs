use super::schema::{SESSION_FIELDS, USER_FIELDS};
use super::{Columns, EngineError, FieldSpec, Record, Value};
use serde::{Deserialize, Serialize};

/// An account row. `id == 0` until the first save.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    #[serde(rename = "user_id")]
    pub id: i64,
    pub flags: i64,
    pub name: String,
    pub email: String,
    pub password: String,
    pub email_activation_key: String,
    pub created_at: i64,
    pub created_by_user_id: i64,
}

/// A login session row. `id == 0` until the first save.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Session {
    #[serde(rename = "session_id")]
    pub id: i64,
    pub flags: i64,
    pub key: String,
    pub expires_at: i64,
    pub user_id: i64,
}

impl Record for User {
    const TABLE: &'static str = "users";
    const FIELDS: &'static [FieldSpec] = USER_FIELDS;

    fn id(&self) -> i64 {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = id;
    }

    fn values(&self) -> Vec<Value> {
        vec![
            Value::Integer(self.flags),
            Value::Text(self.name.clone()),
            Value::Text(self.email.clone()),
            Value::Text(self.password.clone()),
            Value::Text(self.email_activation_key.clone()),
            Value::Integer(self.created_at),
            Value::Integer(self.created_by_user_id),
        ]
    }

    fn from_values(id: i64, values: Vec<Value>) -> Result<Self, EngineError> {
        let mut cols = Columns::<Self>::new(values);
        Ok(Self {
            id,
            flags: cols.int()?,
            name: cols.text()?,
            email: cols.text()?,
            password: cols.text()?,
            email_activation_key: cols.text()?,
            created_at: cols.int()?,
            created_by_user_id: cols.int()?,
        })
    }
}

impl Record for Session {
    const TABLE: &'static str = "sessions";
    const FIELDS: &'static [FieldSpec] = SESSION_FIELDS;

    fn id(&self) -> i64 {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = id;
    }

    fn values(&self) -> Vec<Value> {
        vec![
            Value::Integer(self.flags),
            Value::Text(self.key.clone()),
            Value::Integer(self.expires_at),
            Value::Integer(self.user_id),
        ]
    }

    fn from_values(id: i64, values: Vec<Value>) -> Result<Self, EngineError> {
        let mut cols = Columns::<Self>::new(values);
        Ok(Self {
            id,
            flags: cols.int()?,
            key: cols.text()?,
            expires_at: cols.int()?,
            user_id: cols.int()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn values_follow_declared_columns() {
        let session = Session {
            id: 3,
            flags: 1,
            key: "k".repeat(32),
            expires_at: 1_700_000_000,
            user_id: 9,
        };
        let values = session.values();
        assert_eq!(values.len(), Session::FIELDS.len());
        let back = Session::from_values(3, values).unwrap();
        assert_eq!(back, session);
    }

    #[test]
    fn json_uses_prefixed_id_names() {
        let user = User {
            id: 1,
            email: "a@example.com".into(),
            ..Default::default()
        };
        let json = serde_json::to_value(&user).unwrap();
        assert_eq!(json["user_id"], 1);
        assert!(json.get("id").is_none());

        let session: Session =
            serde_json::from_str(r#"{"session_id":4,"flags":0,"key":"x","expires_at":5,"user_id":1}"#)
                .unwrap();
        assert_eq!(session.id, 4);
        assert_eq!(session.user_id, 1);
    }

    #[test]
    fn from_values_rejects_short_rows() {
        let err = User::from_values(1, vec![Value::Integer(0)]).unwrap_err();
        assert!(matches!(err, EngineError::Decode { field: "name", .. }));
    }
}
