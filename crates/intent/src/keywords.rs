//! Keyword tables for the offline analyzer. Terms are accent-free and
//! matched on token boundaries (see [`crate::text::Normalized`]).

/// Amend phrasing: the user restates the value of the last entry.
pub const AMEND: &[&str] = &[
    "corrigir",
    "corrige",
    "corrija",
    "corrigindo",
    "correcao",
    "errei",
    "lancei errado",
    "anotei errado",
    "esta errado",
    "estava errado",
    "na verdade",
    "valor certo",
    "valor correto",
    "muda para",
    "mudar para",
    "troca para",
    "altera para",
    "alterar para",
];

/// Undo wording that is explicit on its own.
pub const UNDO_STANDALONE: &[&str] = &["desfaz", "desfazer", "desfaca"];

/// Undo verbs. They only count together with an [`ENTRY_REFERENCE`], so
/// "paguei pra cancelar a assinatura" stays an expense.
pub const UNDO_VERBS: &[&str] = &[
    "apaga",
    "apagar",
    "apague",
    "exclui",
    "excluir",
    "exclua",
    "cancela",
    "cancelar",
    "cancele",
    "remove",
    "remover",
    "remova",
    "deleta",
    "deletar",
    "delete",
];

/// What an undo verb must point at.
pub const ENTRY_REFERENCE: &[&str] = &[
    "ultimo",
    "ultima",
    "lancamento",
    "registro",
    "isso",
    "esse",
    "essa",
    "aquilo",
    "venda",
];

/// Past-tense transaction verbs. With an amount they describe a new entry,
/// never an undo.
pub const TRANSACTION_VERBS: &[&str] = &[
    "recebi",
    "ganhei",
    "gastei",
    "gastamos",
    "paguei",
    "pagamos",
    "comprei",
    "compramos",
    "investi",
    "investimos",
    "apliquei",
    "aportei",
    "vendi",
    "vendemos",
    "faturei",
    "faturamos",
    "torrei",
    "desembolsei",
];

pub const QUERY: &[&str] = &[
    "quanto gastei",
    "quanto recebi",
    "quanto ganhei",
    "quanto investi",
    "quanto vendi",
    "quanto tenho",
    "quanto sobrou",
    "quanto falta",
    "qual meu saldo",
    "qual o meu saldo",
    "meu saldo",
    "saldo",
    "resumo",
    "extrato",
    "relatorio",
    "balanco",
    "meus gastos",
    "minhas despesas",
    "minhas receitas",
    "meus investimentos",
    "minhas vendas",
    "minhas financas",
    "consultar",
];

/// Query wording that asks for one line per entry.
pub const ITEMIZED: &[&str] = &[
    "detalhe",
    "detalhes",
    "detalhar",
    "detalhado",
    "detalhada",
    "cada",
    "lista",
    "listar",
    "liste",
    "quais",
    "extrato",
    "discriminar",
    "discrimina",
];

/// Opening a product sale that needs a quantity confirmation.
pub const SALE: &[&str] = &[
    "registrar venda",
    "registrar uma venda",
    "nova venda",
    "cadastrar venda",
    "cadastrar uma venda",
    "lancar venda",
    "lancar uma venda",
];

pub const INCOME: &[&str] = &[
    "recebi",
    "ganhei",
    "entrou",
    "entraram",
    "caiu",
    "recebimento",
    "receita",
    "salario",
    "vendi",
    "vendemos",
    "faturei",
    "faturamos",
    "me pagaram",
    "me pagou",
    "depositaram",
    "rendeu",
];

pub const EXPENSE: &[&str] = &[
    "gastei",
    "gastamos",
    "paguei",
    "pagamos",
    "comprei",
    "compramos",
    "despesa",
    "gasto",
    "conta de",
    "boleto",
    "fatura",
];

pub const INVESTMENT: &[&str] = &[
    "investi",
    "investimos",
    "investimento",
    "apliquei",
    "aplicacao",
    "aporte",
    "aportei",
    "poupanca",
    "tesouro",
    "cdb",
    "lci",
    "lca",
    "acoes",
    "fii",
    "fundo",
    "cripto",
    "bitcoin",
];

/// Weaker expense wording, only used when nothing stronger matched.
pub const GENERIC_EXPENSE: &[&str] = &[
    "custou",
    "custa",
    "saiu",
    "torrei",
    "desembolsei",
    "debitado",
    "debitaram",
    "cobrado",
    "cobraram",
    "gastar",
    "pagar",
];

/// Recurring bills: an expense mentioning one of these is fixed.
pub const FIXED_EXPENSE: &[&str] = &[
    "aluguel",
    "luz",
    "energia",
    "agua",
    "internet",
    "mensalidade",
    "assinatura",
    "condominio",
    "plano",
    "telefone",
    "seguro",
    "financiamento",
    "parcela",
    "escola",
    "iptu",
    "ipva",
];

/// Wording that frames a message as business rather than personal.
pub const BUSINESS: &[&str] = &[
    "empresa",
    "negocio",
    "cliente",
    "clientes",
    "fornecedor",
    "fornecedores",
    "estoque",
    "mercadoria",
    "mercadorias",
    "insumo",
    "insumos",
    "materia prima",
    "cnpj",
    "mei",
    "funcionario",
    "funcionarios",
    "vendi",
    "vendemos",
    "venda",
    "vendas",
    "faturei",
    "faturamos",
    "encomenda",
    "encomendas",
];

pub const BUSINESS_INCOME_CATEGORY: &str = "vendas";
pub const BUSINESS_VARIABLE_EXPENSE_CATEGORY: &str = "despesa variável do negócio";
pub const BUSINESS_FIXED_EXPENSE_CATEGORY: &str = "despesa fixa do negócio";

/// Ordered (terms, category) tables; the first row with a match wins.
pub type CategoryTable = &'static [(&'static [&'static str], &'static str)];

pub const PERSONAL_INCOME_CATEGORIES: CategoryTable = &[
    (&["salario", "holerite", "contracheque"], "salário"),
    (&["freela", "freelance", "bico", "projeto"], "freelance"),
    (&["aluguel"], "aluguel recebido"),
    (&["rendimento", "rendimentos", "juros", "dividendo", "dividendos", "rendeu"], "rendimentos"),
    (&["bonus", "decimo terceiro", "ferias", "plr"], "bônus"),
    (&["presente", "mesada"], "presentes"),
    (&["reembolso", "estorno"], "reembolso"),
];

pub const PERSONAL_EXPENSE_CATEGORIES: CategoryTable = &[
    (
        &[
            "supermercado",
            "mercado",
            "feira",
            "padaria",
            "acougue",
            "hortifruti",
            "restaurante",
            "lanche",
            "lanchonete",
            "almoco",
            "jantar",
            "comida",
            "ifood",
            "pizza",
            "cafe",
        ],
        "alimentação",
    ),
    (
        &[
            "uber",
            "taxi",
            "gasolina",
            "combustivel",
            "etanol",
            "onibus",
            "metro",
            "estacionamento",
            "pedagio",
            "passagem",
        ],
        "transporte",
    ),
    (&["aluguel", "condominio", "iptu"], "moradia"),
    (
        &["luz", "energia", "agua", "gas", "internet", "telefone", "celular"],
        "contas da casa",
    ),
    (
        &[
            "farmacia",
            "remedio",
            "remedios",
            "medico",
            "dentista",
            "hospital",
            "exame",
            "plano de saude",
        ],
        "saúde",
    ),
    (
        &["escola", "faculdade", "curso", "livro", "livros", "mensalidade"],
        "educação",
    ),
    (
        &[
            "cinema", "netflix", "spotify", "streaming", "show", "bar", "viagem", "assinatura",
        ],
        "lazer",
    ),
    (
        &["roupa", "roupas", "sapato", "tenis", "shopping", "presente"],
        "compras",
    ),
    (&["seguro", "ipva", "financiamento", "parcela"], "financiamentos e seguros"),
];

pub const INVESTMENT_CATEGORIES: CategoryTable = &[
    (&["poupanca"], "poupança"),
    (&["tesouro"], "tesouro direto"),
    (&["cdb", "lci", "lca"], "renda fixa"),
    (&["acoes", "fii", "bolsa"], "renda variável"),
    (&["cripto", "bitcoin"], "criptomoedas"),
    (&["fundo"], "fundos"),
];

/// Relative dates.
pub const DAY_BEFORE_YESTERDAY: &[&str] = &["anteontem"];
pub const YESTERDAY: &[&str] = &["ontem"];
pub const TODAY: &[&str] = &["hoje", "agora", "agorinha"];
