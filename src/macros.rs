/// Helper macro for locking a `Mutex`
///
/// ```rust, ignore
///  let pooled = lock!(self.idle).pop();
///  lock!(self.idle).push(archive);
/// ```
macro_rules! lock {
    ($lock:expr) => {
        $lock.lock().expect("Failed to acquire lock")
    };
}

/// Helper macro for reading a `RwLock`
///
/// ```rust, ignore
///  let archives = read_lock!(self.archives);
///  println!("{}", archives.len());
/// ```
macro_rules! read_lock {
    ($rwlock:expr) => {
        $rwlock.read().expect("Failed to acquire read lock")
    };
}

/// Helper macro for writing to a `RwLock`
///
/// ```rust, ignore
///  write_lock!(self.archives).push(archive);
/// ```
macro_rules! write_lock {
    ($rwlock:expr) => {
        $rwlock.write().expect("Failed to acquire write lock")
    };
}
