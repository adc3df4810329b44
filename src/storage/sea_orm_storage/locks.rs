//! 进程内按键加锁
//!
//! 同一个讨论的发消息、标记已读、删除必须串行执行，
//! 这里为每个键维护一把异步互斥锁，配合数据库事务使用。
//! 最后一个持有者释放时对应的表项随之移除。

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

type LockTable = DashMap<String, Arc<Mutex<()>>>;

#[derive(Debug, Default)]
pub struct KeyedLocks {
    locks: Arc<LockTable>,
}

/// 持有期间同键的其他调用方等待；释放时清理无人等待的表项
#[derive(Debug)]
pub struct KeyedLockGuard {
    table: Arc<LockTable>,
    key: String,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for KeyedLockGuard {
    fn drop(&mut self) {
        // 先释放互斥锁，表中只剩自身引用时才移除
        drop(self.guard.take());
        self.table
            .remove_if(&self.key, |_, mutex| Arc::strong_count(mutex) == 1);
    }
}

impl KeyedLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// 获取指定键的锁
    pub async fn lock(&self, key: impl Into<String>) -> KeyedLockGuard {
        let key = key.into();
        // 先克隆出 Arc，再在 DashMap 分片锁之外等待
        let mutex = self
            .locks
            .entry(key.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let guard = mutex.lock_owned().await;
        KeyedLockGuard {
            table: self.locks.clone(),
            key,
            guard: Some(guard),
        }
    }

    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

pub fn discussion_key(discussion_id: i64) -> String {
    format!("discussion:{discussion_id}")
}

pub fn thread_creation_key(student_id: i64, clone_id: Option<i64>) -> String {
    match clone_id {
        Some(clone_id) => format!("thread:{student_id}:clone:{clone_id}"),
        None => format!("thread:{student_id}:general"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_same_key_is_serialized() {
        let locks = Arc::new(KeyedLocks::new());
        let active = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let locks = locks.clone();
            let active = active.clone();
            let max_seen = max_seen.clone();
            handles.push(tokio::spawn(async move {
                let _guard = locks.lock(discussion_key(1)).await;
                let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                max_seen.fetch_max(now, Ordering::SeqCst);
                tokio::task::yield_now().await;
                active.fetch_sub(1, Ordering::SeqCst);
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(max_seen.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_entries_removed_on_release() {
        let locks = KeyedLocks::new();
        let guard = locks.lock(discussion_key(1)).await;
        drop(locks.lock(discussion_key(2)).await);
        assert_eq!(locks.len(), 1);
        drop(guard);
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn test_waiter_keeps_entry_alive() {
        let locks = Arc::new(KeyedLocks::new());
        let first = locks.lock(discussion_key(7)).await;

        let waiter = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let _guard = locks.lock(discussion_key(7)).await;
            })
        };
        // 等待方已拿到 Arc 后再释放第一把锁
        let holders = || {
            locks
                .locks
                .get(&discussion_key(7))
                .map(|mutex| Arc::strong_count(&*mutex))
                .unwrap_or(0)
        };
        while holders() < 3 {
            tokio::task::yield_now().await;
        }
        drop(first);
        waiter.await.unwrap();
        assert!(locks.is_empty());
    }
}
