//! # warden-channels
//!
//! WhatsApp integration for Warden: the bot lifecycle, inbound message
//! handling, moderation actions, and the auth-state persistence adapter.

pub mod whatsapp;
pub mod whatsapp_store;
