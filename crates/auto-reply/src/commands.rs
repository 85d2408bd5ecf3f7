//! Commands that bypass classification once the user is signed in.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Logout,
    Help,
}

impl Command {
    /// Whole-message match, case-insensitive, optional leading `/`.
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        let word = text.trim().trim_start_matches('/').trim().to_lowercase();
        match word.as_str() {
            "sair" | "logout" => Some(Self::Logout),
            "ajuda" | "help" => Some(Self::Help),
            _ => None,
        }
    }
}

pub const HELP: &str = "Eu registro suas finanças pelo chat. Exemplos:\n\
- \"gastei 50 no mercado\"\n\
- \"recebi 2000 de salário\"\n\
- \"apliquei 300 no tesouro\"\n\
- \"quanto gastei este mês?\" e depois \"mostre cada uma\"\n\
- \"na verdade foram 60\" ou \"apaga o último\" para corrigir\n\
- \"registrar uma venda\" para vendas do seu negócio\n\
Envie \"sair\" para desconectar.";

pub const LOGGED_OUT: &str = "Você saiu da sua conta. Envie qualquer mensagem para entrar novamente.";
