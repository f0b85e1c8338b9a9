// The runtime adapter interface (spec.md §6). Out of scope per spec.md §1 -
// "a runtime adapter that implements host-side mocks of imported host
// functions; the spec fixes only the import names and signatures". This
// trait documents that fixed ABI so an embedder has a single collaborator
// to implement; no implementation lives in this crate.

/// One method per WAT import in `CodeGenerator::emit_imports`. String
/// arguments are `(ptr, len)` pairs into the module's own linear memory;
/// `fs_*`/`http_*` return a promise id to be resolved by `promise_await`.
pub trait HostAdapter {
    fn js_console_log(&mut self, ptr: i32, len: i32);
    fn json_decode(&mut self, ptr: i32, len: i32) -> i32;
    fn json_encode(&mut self, value_ptr: i32) -> i32;
    fn http_get(&mut self, url_ptr: i32, url_len: i32) -> i32;
    fn http_post(&mut self, url_ptr: i32, url_len: i32, body_ptr: i32, body_len: i32) -> i32;
    fn fs_read_file(&mut self, path_ptr: i32, path_len: i32) -> i32;
    fn fs_write_file(&mut self, path_ptr: i32, path_len: i32, body_ptr: i32, body_len: i32) -> i32;
    fn set_timeout(&mut self, callback_table_idx: i32, millis: i32) -> i32;
    fn clear_timeout(&mut self, timer_id: i32);
    fn promise_await(&mut self, promise_id: i32) -> i32;
}
