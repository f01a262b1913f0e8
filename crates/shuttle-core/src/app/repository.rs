//! Repository - 名前付きプロトタイプの登録と管理
//!
//! # 登録ルール
//! - 名前の衝突は `overwrite = false` なら `RegistryError::Conflict`
//! - `overwrite = true` なら既存の登録を置き換える（位置は維持）
//! - `add_all` は全件チェックしてから書き込む（途中で失敗しても何も変わらない）

use indexmap::IndexMap;

use crate::ports::Prototype;

/// 登録時のエラー
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("{kind} `{name}` is already registered")]
    Conflict { kind: &'static str, name: String },
}

/// Prototypes keyed by name, in registration order.
#[derive(Debug)]
pub struct Repository<P> {
    kind: &'static str,
    items: IndexMap<String, P>,
}

impl<P: Prototype> Repository<P> {
    /// `kind` names the item kind in conflict messages, e.g. "workflow".
    pub fn new(kind: &'static str) -> Self {
        Self {
            kind,
            items: IndexMap::new(),
        }
    }

    /// 1 件登録。`overwrite` が false なら同名の既存登録で Conflict
    pub fn add(&mut self, item: P, overwrite: bool) -> Result<(), RegistryError> {
        if !overwrite && self.items.contains_key(item.name()) {
            return Err(self.conflict(item.name()));
        }
        self.items.insert(item.name().to_owned(), item);
        Ok(())
    }

    /// 複数件をまとめて登録。衝突があれば何も登録しない
    pub fn add_all(
        &mut self,
        items: impl IntoIterator<Item = P>,
        overwrite: bool,
    ) -> Result<(), RegistryError> {
        let items: Vec<P> = items.into_iter().collect();

        if !overwrite {
            for (i, item) in items.iter().enumerate() {
                let name = item.name();
                let repeated = items[..i].iter().any(|prev| prev.name() == name);
                if repeated || self.items.contains_key(name) {
                    return Err(self.conflict(name));
                }
            }
        }

        for item in items {
            self.items.insert(item.name().to_owned(), item);
        }
        Ok(())
    }

    /// 名前で検索
    pub fn find(&self, name: &str) -> Option<&P> {
        self.items.get(name)
    }

    /// 名前が登録済みか
    pub fn contains(&self, name: &str) -> bool {
        self.items.contains_key(name)
    }

    /// 登録順の名前一覧
    pub fn names(&self) -> Vec<String> {
        self.items.keys().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &P> {
        self.items.values()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    fn conflict(&self, name: &str) -> RegistryError {
        RegistryError::Conflict {
            kind: self.kind,
            name: name.to_owned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Unit {
        name: &'static str,
        version: u32,
    }

    impl Prototype for Unit {
        fn name(&self) -> &str {
            self.name
        }
    }

    fn unit(name: &'static str, version: u32) -> Unit {
        Unit { name, version }
    }

    #[test]
    fn test_add_then_find() {
        let mut repo = Repository::new("workflow");
        repo.add(unit("Greeting", 1), false).unwrap();

        assert_eq!(repo.find("Greeting").map(|u| u.version), Some(1));
        assert!(repo.find("Missing").is_none());
        assert_eq!(repo.names(), vec!["Greeting".to_owned()]);
    }

    #[test]
    fn test_conflict_without_overwrite() {
        let mut repo = Repository::new("workflow");
        repo.add(unit("Greeting", 1), false).unwrap();

        let err = repo.add(unit("Greeting", 2), false).unwrap_err();
        assert_eq!(
            err,
            RegistryError::Conflict {
                kind: "workflow",
                name: "Greeting".to_owned()
            }
        );
        assert_eq!(repo.find("Greeting").map(|u| u.version), Some(1));
    }

    #[test]
    fn test_overwrite_replaces_in_place_and_is_idempotent() {
        let mut repo = Repository::new("activity");
        repo.add(unit("A", 1), false).unwrap();
        repo.add(unit("B", 1), false).unwrap();

        repo.add(unit("A", 2), true).unwrap();
        repo.add(unit("A", 2), true).unwrap();
        assert_eq!(repo.len(), 2);
        assert_eq!(repo.names(), vec!["A".to_owned(), "B".to_owned()]);
        assert_eq!(repo.find("A").map(|u| u.version), Some(2));
    }

    #[test]
    fn test_add_all_is_all_or_nothing() {
        let mut repo = Repository::new("activity");
        repo.add(unit("B", 1), false).unwrap();

        let err = repo
            .add_all([unit("A", 1), unit("B", 2), unit("C", 1)], false)
            .unwrap_err();
        assert!(matches!(err, RegistryError::Conflict { ref name, .. } if name == "B"));
        assert!(!repo.contains("A"));
        assert!(!repo.contains("C"));

        let err = repo.add_all([unit("X", 1), unit("X", 2)], false).unwrap_err();
        assert!(matches!(err, RegistryError::Conflict { ref name, .. } if name == "X"));
        assert!(!repo.contains("X"));
    }
}
