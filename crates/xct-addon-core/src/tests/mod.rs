mod store;
mod telegram;
