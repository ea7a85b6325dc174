pub mod mw_ctx;
