/// SQL keywords, operators and punctuation.
#[allow(clippy::upper_case_acronyms)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Token {
    // keywords
    SELECT,
    FROM,
    WHERE,
    AND,
    IN,
    AS,
    ON,
    LEFT,
    JOIN,
    INSERT,
    INTO,
    VALUES,
    UPDATE,
    SET,
    DELETE,
    DEFAULT,
    // operators
    EQ,
    // punctuation
    LPAREN,
    RPAREN,
    COMMA,
}

impl Token {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Token::SELECT => "SELECT",
            Token::FROM => "FROM",
            Token::WHERE => "WHERE",
            Token::AND => "AND",
            Token::IN => "IN",
            Token::AS => "AS",
            Token::ON => "ON",
            Token::LEFT => "LEFT",
            Token::JOIN => "JOIN",
            Token::INSERT => "INSERT",
            Token::INTO => "INTO",
            Token::VALUES => "VALUES",
            Token::UPDATE => "UPDATE",
            Token::SET => "SET",
            Token::DELETE => "DELETE",
            Token::DEFAULT => "DEFAULT",
            Token::EQ => "=",
            Token::LPAREN => "(",
            Token::RPAREN => ")",
            Token::COMMA => ",",
        }
    }

    /// Comparison operators get a space on both sides.
    pub const fn is_operator(&self) -> bool {
        matches!(self, Token::EQ)
    }
}
