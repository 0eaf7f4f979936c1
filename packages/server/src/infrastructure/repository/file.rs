//! File-backed Room Store.
//!
//! Layout: `<data_dir>/<hex(room key)>/<key>.json`, with the wake-up stored as
//! `alarm.json`. Room keys are opaque and may contain path separators, so the
//! directory is the hex encoding of the key's bytes, split into segments of at
//! most `SEGMENT_LEN` characters to stay under the file name limit. Writes go
//! to a temporary file that is then renamed over the target.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::Value;

use crate::domain::{RoomKey, RoomStore, StoreError, Timestamp};

const ALARM_FILE: &str = "alarm";

/// Longest directory name produced for a room key
const SEGMENT_LEN: usize = 200;

/// Room store writing one JSON file per key
#[derive(Debug, Clone)]
pub struct FileRoomStore {
    data_dir: PathBuf,
}

impl FileRoomStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    fn room_dir(&self, room: &RoomKey) -> PathBuf {
        let encoded: String = room
            .as_str()
            .bytes()
            .map(|b| format!("{b:02x}"))
            .collect();
        // Hex is ASCII, so byte chunks are valid UTF-8. Segments never end in
        // `.json`, so a longer key's directory cannot clash with a value file.
        encoded
            .as_bytes()
            .chunks(SEGMENT_LEN)
            .filter_map(|chunk| std::str::from_utf8(chunk).ok())
            .fold(self.data_dir.clone(), |dir, segment| dir.join(segment))
    }

    fn key_path(&self, room: &RoomKey, key: &str) -> Result<PathBuf, StoreError> {
        if key.is_empty() || !key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(StoreError::Io(format!("invalid store key '{key}'")));
        }
        Ok(self.room_dir(room).join(format!("{key}.json")))
    }

    async fn read_json(path: &Path) -> Result<Option<Value>, StoreError> {
        match tokio::fs::read(path).await {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map(Some)
                .map_err(|e| StoreError::Serialization(e.to_string())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::Io(e.to_string())),
        }
    }

    async fn write_json(path: &Path, value: &Value) -> Result<(), StoreError> {
        let bytes =
            serde_json::to_vec(value).map_err(|e| StoreError::Serialization(e.to_string()))?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StoreError::Io(e.to_string()))?;
        }
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, bytes)
            .await
            .map_err(|e| StoreError::Io(e.to_string()))?;
        tokio::fs::rename(&tmp, path)
            .await
            .map_err(|e| StoreError::Io(e.to_string()))
    }

    async fn remove(path: &Path) -> Result<(), StoreError> {
        match tokio::fs::remove_file(path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::Io(e.to_string())),
        }
    }
}

#[async_trait]
impl RoomStore for FileRoomStore {
    async fn get(&self, room: &RoomKey, key: &str) -> Result<Option<Value>, StoreError> {
        Self::read_json(&self.key_path(room, key)?).await
    }

    async fn put(&self, room: &RoomKey, key: &str, value: Value) -> Result<(), StoreError> {
        Self::write_json(&self.key_path(room, key)?, &value).await
    }

    async fn delete(&self, room: &RoomKey, key: &str) -> Result<(), StoreError> {
        Self::remove(&self.key_path(room, key)?).await
    }

    async fn get_alarm(&self, room: &RoomKey) -> Result<Option<Timestamp>, StoreError> {
        let value = Self::read_json(&self.key_path(room, ALARM_FILE)?).await?;
        value
            .map(serde_json::from_value)
            .transpose()
            .map_err(|e| StoreError::Serialization(e.to_string()))
    }

    async fn set_alarm(&self, room: &RoomKey, at: Timestamp) -> Result<(), StoreError> {
        Self::write_json(&self.key_path(room, ALARM_FILE)?, &Value::from(at.value())).await
    }

    async fn delete_alarm(&self, room: &RoomKey) -> Result<(), StoreError> {
        Self::remove(&self.key_path(room, ALARM_FILE)?).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store() -> (FileRoomStore, PathBuf) {
        let dir = std::env::temp_dir().join(format!("edgerooms-test-{}", uuid::Uuid::new_v4()));
        (FileRoomStore::new(&dir), dir)
    }

    fn room(key: &str) -> RoomKey {
        RoomKey::new(key.to_string()).unwrap()
    }

    #[tokio::test]
    async fn test_put_then_get_survives_new_instance() {
        // テスト項目: 書き込んだ値が別インスタンスからも読み出せる（永続化）
        // given (前提条件):
        let (store, dir) = temp_store();
        let value = serde_json::json!({"memories": ["a"], "todos": []});
        store.put(&room("r1"), "pinned", value.clone()).await.unwrap();

        // when (操作):
        let reopened = FileRoomStore::new(&dir);
        let loaded = reopened.get(&room("r1"), "pinned").await.unwrap();

        // then (期待する結果):
        assert_eq!(loaded, Some(value));
        let _ = std::fs::remove_dir_all(dir);
    }

    #[tokio::test]
    async fn test_room_key_with_path_separators_stays_inside_data_dir() {
        // テスト項目: パス区切りを含むルームキーでもデータディレクトリ外に書き込まない
        // given (前提条件):
        let (store, dir) = temp_store();
        let tricky = room("../../etc/passwd");

        // when (操作):
        store.put(&tricky, "ownerId", Value::from("u1")).await.unwrap();

        // then (期待する結果):
        let room_dir = store.room_dir(&tricky);
        assert!(room_dir.starts_with(&dir));
        assert!(room_dir.join("ownerId.json").exists());
        let _ = std::fs::remove_dir_all(dir);
    }

    #[tokio::test]
    async fn test_longest_room_keys_are_persisted() {
        // テスト項目: 最大長 (128 文字) のルームキーでも ASCII・マルチバイトの両方で保存できる
        // given (前提条件):
        let (store, dir) = temp_store();
        let ascii = room(&"r".repeat(128));
        let multibyte = room(&"部".repeat(128));

        // when (操作):
        store.put(&ascii, "ownerId", Value::from("u1")).await.unwrap();
        store.put(&multibyte, "ownerId", Value::from("u2")).await.unwrap();

        // then (期待する結果):
        let reopened = FileRoomStore::new(&dir);
        assert_eq!(
            reopened.get(&ascii, "ownerId").await.unwrap(),
            Some(Value::from("u1"))
        );
        assert_eq!(
            reopened.get(&multibyte, "ownerId").await.unwrap(),
            Some(Value::from("u2"))
        );
        let room_dir = store.room_dir(&multibyte);
        assert!(room_dir.starts_with(&dir));
        for component in room_dir.strip_prefix(&dir).unwrap().components() {
            assert!(component.as_os_str().len() <= SEGMENT_LEN);
        }
        let _ = std::fs::remove_dir_all(dir);
    }

    #[tokio::test]
    async fn test_rooms_sharing_a_hex_prefix_stay_separate() {
        // テスト項目: 16 進表現の先頭が一致する長いキーと短いキーが互いの値を上書きしない
        // given (前提条件):
        let (store, dir) = temp_store();
        let short = room(&"a".repeat(100));
        let long = room(&"a".repeat(128));

        // when (操作):
        store.put(&short, "ownerId", Value::from("short")).await.unwrap();
        store.put(&long, "ownerId", Value::from("long")).await.unwrap();

        // then (期待する結果):
        assert_eq!(
            store.get(&short, "ownerId").await.unwrap(),
            Some(Value::from("short"))
        );
        assert_eq!(
            store.get(&long, "ownerId").await.unwrap(),
            Some(Value::from("long"))
        );
        let _ = std::fs::remove_dir_all(dir);
    }

    #[tokio::test]
    async fn test_missing_values_read_as_none() {
        // テスト項目: 未保存のキーとアラームは None として読める
        // given (前提条件):
        let (store, dir) = temp_store();

        // when (操作):
        let value = store.get(&room("r1"), "history").await.unwrap();
        let alarm = store.get_alarm(&room("r1")).await.unwrap();

        // then (期待する結果):
        assert_eq!(value, None);
        assert_eq!(alarm, None);
        let _ = std::fs::remove_dir_all(dir);
    }

    #[tokio::test]
    async fn test_alarm_roundtrip_and_delete() {
        // テスト項目: アラームの保存・読み出し・削除ができる
        // given (前提条件):
        let (store, dir) = temp_store();
        let r = room("r1");

        // when (操作):
        store.set_alarm(&r, Timestamp::new(1_700_000_030_000)).await.unwrap();
        let scheduled = store.get_alarm(&r).await.unwrap();
        store.delete_alarm(&r).await.unwrap();
        store.delete_alarm(&r).await.unwrap();

        // then (期待する結果):
        assert_eq!(scheduled, Some(Timestamp::new(1_700_000_030_000)));
        assert_eq!(store.get_alarm(&r).await.unwrap(), None);
        let _ = std::fs::remove_dir_all(dir);
    }

    #[tokio::test]
    async fn test_invalid_key_is_rejected() {
        // テスト項目: ファイル名として不正なキーは拒否される
        // given (前提条件):
        let (store, dir) = temp_store();

        // when (操作):
        let result = store.put(&room("r1"), "../escape", Value::Null).await;

        // then (期待する結果):
        assert!(matches!(result, Err(StoreError::Io(_))));
        let _ = std::fs::remove_dir_all(dir);
    }
}
