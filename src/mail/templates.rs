use super::queue::OutgoingMail;

pub fn verification_link(frontend_url: &str, email: &str, code: i32) -> String {
    format!(
        "{}/verify-email?email={}&code={}",
        frontend_url,
        urlencoding::encode(email),
        code
    )
}

pub fn reset_link(frontend_url: &str, email: &str, code: i32) -> String {
    format!(
        "{}/reset-password?email={}&code={}",
        frontend_url,
        urlencoding::encode(email),
        code
    )
}

pub fn verification_email(frontend_url: &str, name: &str, email: &str, code: i32) -> OutgoingMail {
    let link = verification_link(frontend_url, email, code);
    OutgoingMail {
        to: email.to_string(),
        subject: "Verify your email address".into(),
        body: format!(
            "Hi {name},\n\n\
             Confirm your email address to activate your Job Board account:\n\n\
             {link}\n\n\
             Or enter this code: {code}\n\n\
             If you did not create an account, you can ignore this message.\n"
        ),
    }
}

pub fn reset_email(frontend_url: &str, name: &str, email: &str, code: i32) -> OutgoingMail {
    let link = reset_link(frontend_url, email, code);
    OutgoingMail {
        to: email.to_string(),
        subject: "Reset your password".into(),
        body: format!(
            "Hi {name},\n\n\
             A password reset was requested for your Job Board account:\n\n\
             {link}\n\n\
             Or enter this code: {code}\n\n\
             If you did not request this, your password stays unchanged.\n"
        ),
    }
}
