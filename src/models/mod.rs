pub mod answer;
pub mod graph;
pub mod question;
pub mod test_result;
pub mod user;
pub mod user_session;
pub mod welcome_screen;
