mod codec_tests;
mod key_manager_tests;
