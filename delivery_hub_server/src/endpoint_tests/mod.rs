mod gate;
mod health;
mod helpers;
mod mocks;
mod staff_api;
mod webhooks;
