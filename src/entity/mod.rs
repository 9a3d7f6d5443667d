pub mod admin;
pub mod challenge;
pub mod resource;
pub mod resultat;
pub mod story;
pub mod tip;
pub mod utilisateur;
