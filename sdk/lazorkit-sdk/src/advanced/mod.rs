pub mod framer;
pub mod instructions;
pub mod secp256r1;
