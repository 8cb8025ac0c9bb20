mod chat_tests;
mod directory_tests;
mod gateway_tests;
mod health_tests;
